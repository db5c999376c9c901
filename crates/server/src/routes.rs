//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::ratelimit::ip_rate_limit_middleware;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Hardening headers added to every response that does not already set them.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
         form-action 'self';frame-ancestors 'self';img-src 'self' data:;\
         object-src 'none';script-src 'self';script-src-attr 'none';\
         style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/upload", post(handlers::upload_frames))
        .route("/frames", get(handlers::list_frames))
        .route("/frames/{frame_number}", get(handlers::get_frame))
        // Load balancer and orchestrator probes
        .route("/health", get(handlers::health_check));

    // SECURITY: restrict /metrics to scraper IPs at the network level.
    if state.config.server.metrics_enabled {
        crate::metrics::register_metrics();
        router = router.route("/metrics", get(metrics_handler));
    }

    // Front-end assets for everything the API does not handle.
    if let Some(static_dir) = &state.config.server.static_dir {
        if static_dir.is_dir() {
            tracing::info!(dir = %static_dir.display(), "Serving static files");
            router = router.fallback_service(ServeDir::new(static_dir));
        } else {
            tracing::debug!(dir = %static_dir.display(), "Static directory not found, not serving");
        }
    }

    let rate_limit_state = state.rate_limit.clone();

    // Order of execution: TraceLayer -> security headers -> IP rate limit -> body limit -> handler
    router = router
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            ip_rate_limit_middleware,
        ));

    if state.config.server.security_headers {
        for &(name, value) in SECURITY_HEADERS {
            router = router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ));
        }
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
