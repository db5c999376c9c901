//! Per-IP rate limiting middleware.
//!
//! Each client IP gets `max_requests` per `window_secs`, enforced with a
//! keyed GCRA limiter. The full allowance is available as a burst and
//! refills evenly across the window.
//!
//! # Memory Safety
//!
//! - Configurable maximum number of tracked IPs (default: 100,000)
//! - Stale entries evicted by TTL from a periodic background task
//!
//! # Security Note
//!
//! X-Forwarded-For and X-Real-IP are only read when the direct peer is
//! listed in `trusted_proxies`:
//!
//! - Empty list (default): only the connection IP is used
//! - List of IPs/CIDRs: headers trusted only from these peers
//! - ["*"]: headers trusted from everyone (NOT recommended for production)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{DashMap, mapref::entry::Entry};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
};
use ipnet::IpNet;
use radar_core::config::RateLimitConfig;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Evictions needed to force a rebuild, as a fraction of tracked IPs.
const REBUILD_EVICTION_THRESHOLD_FRACTION: f64 = 0.10;

/// Evictions that always justify a rebuild.
const REBUILD_EVICTION_MIN_COUNT: usize = 100;

/// Below the eviction threshold, rebuild at most this often.
const REBUILD_MIN_INTERVAL: Duration = Duration::from_secs(300);

type KeyedLimiter =
    RateLimiter<String, DashMap<String, InMemoryState>, DefaultClock, NoOpMiddleware>;

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<RateLimitStateInner>>,
}

/// Inner state that's only allocated when rate limiting is enabled.
struct RateLimitStateInner {
    /// Keyed limiter; swapped out wholesale after cleanup since governor
    /// cannot remove single keys.
    limiter: RwLock<KeyedLimiter>,
    /// Last access per IP, used for TTL eviction and the capacity bound.
    last_access: DashMap<String, Instant>,
    trusted_proxies: TrustedProxies,
    max_entries: u32,
    entry_ttl: Duration,
    quota: Quota,
    /// When the limiter was last rebuilt.
    last_rebuild: RwLock<Instant>,
    /// Whether the missing-ConnectInfo warning has been logged.
    connect_info_warned: AtomicBool,
    /// Whether the at-capacity warning has been logged since the last cleanup.
    at_capacity_warned: AtomicBool,
}

#[derive(Clone, Debug)]
enum TrustedEntry {
    Ip(IpAddr),
    Cidr(IpNet),
}

/// Trusted proxy configuration for IP extraction.
#[derive(Clone, Debug)]
enum TrustedProxies {
    None,
    All,
    List(Vec<TrustedEntry>),
}

impl TrustedProxies {
    fn from_config(proxies: &[String]) -> Self {
        if proxies.is_empty() {
            return Self::None;
        }
        if proxies.len() == 1 && proxies[0] == "*" {
            return Self::All;
        }

        let entries = proxies
            .iter()
            .filter_map(|p| {
                if p.contains('/') {
                    match p.parse::<IpNet>() {
                        Ok(net) => Some(TrustedEntry::Cidr(net)),
                        Err(e) => {
                            tracing::warn!("Invalid CIDR in trusted_proxies: '{}': {}", p, e);
                            None
                        }
                    }
                } else {
                    match p.parse::<IpAddr>() {
                        Ok(ip) => Some(TrustedEntry::Ip(ip)),
                        Err(e) => {
                            tracing::warn!("Invalid IP in trusted_proxies: '{}': {}", p, e);
                            None
                        }
                    }
                }
            })
            .collect();
        Self::List(entries)
    }

    fn is_trusted(&self, connection_ip: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::List(entries) => {
                let Ok(ip) = connection_ip.parse::<IpAddr>() else {
                    return false;
                };
                entries.iter().any(|entry| match entry {
                    TrustedEntry::Ip(trusted) => *trusted == ip,
                    TrustedEntry::Cidr(network) => network.contains(&ip),
                })
            }
        }
    }
}

/// Whether a cleanup that evicted `evicted` of `entries_before` IPs should
/// rebuild the limiter.
fn should_rebuild(
    evicted: usize,
    entries_before: usize,
    last_rebuild: Instant,
    now: Instant,
) -> bool {
    let threshold_by_fraction = (entries_before as f64 * REBUILD_EVICTION_THRESHOLD_FRACTION) as usize;
    if evicted >= threshold_by_fraction.max(REBUILD_EVICTION_MIN_COUNT) {
        return true;
    }
    now.duration_since(last_rebuild) >= REBUILD_MIN_INTERVAL
}

/// Build the per-IP quota: `max_requests` burst, refilled across `window_secs`.
fn quota_from_config(config: &RateLimitConfig) -> Quota {
    let max = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
    let period = Duration::from_secs(config.window_secs.max(1)) / max.get();
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(max))
        .allow_burst(max)
}

impl RateLimitState {
    /// Create a new rate limit state from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }

        let quota = quota_from_config(config);
        Self {
            inner: Some(Arc::new(RateLimitStateInner {
                limiter: RwLock::new(RateLimiter::dashmap(quota)),
                last_access: DashMap::new(),
                trusted_proxies: TrustedProxies::from_config(&config.trusted_proxies),
                max_entries: config.max_entries,
                entry_ttl: Duration::from_secs(config.entry_ttl_secs),
                quota,
                last_rebuild: RwLock::new(Instant::now()),
                connect_info_warned: AtomicBool::new(false),
                at_capacity_warned: AtomicBool::new(false),
            })),
        }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Check if a request from the given IP is allowed.
    pub fn check_ip(&self, ip: &str) -> Result<(), RateLimitError> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };

        let now = Instant::now();
        let key = ip.to_string();

        // DashMap::len() must not run while an entry guard is held.
        let current_len = inner.last_access.len();
        let at_capacity = current_len >= inner.max_entries as usize;

        match inner.last_access.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                if at_capacity {
                    if !inner.at_capacity_warned.swap(true, Ordering::Relaxed) {
                        tracing::warn!(
                            current_entries = current_len,
                            max_entries = inner.max_entries,
                            "Rate limiter at capacity, rejecting new client IPs"
                        );
                    }
                    return Err(RateLimitError {
                        retry_after_secs: 60,
                        reason: RateLimitReason::AtCapacity,
                    });
                }
                entry.insert(now);
            }
        }

        let limiter = inner.limiter.read().unwrap_or_else(|poisoned| {
            tracing::warn!("rate limiter RwLock was poisoned, recovering with into_inner()");
            poisoned.into_inner()
        });
        match limiter.check_key(&key) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time =
                    not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()));
                Err(RateLimitError {
                    retry_after_secs: wait_time.as_secs() + 1,
                    reason: RateLimitReason::RateLimited,
                })
            }
        }
    }

    /// Evict entries not seen within the TTL. Returns the number evicted.
    ///
    /// Governor cannot drop single keys, so its memory is reclaimed by
    /// swapping in a fresh limiter. That also resets the allowance of every
    /// remaining client, so it only happens when enough entries were evicted
    /// or [`REBUILD_MIN_INTERVAL`] has passed since the previous rebuild.
    pub fn cleanup(&self) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };

        let now = Instant::now();
        let ttl = inner.entry_ttl;
        let entries_before = inner.last_access.len();

        let stale: Vec<String> = inner
            .last_access
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for key in stale {
            // Re-check under the entry lock in case the IP came back meanwhile.
            if inner
                .last_access
                .remove_if(&key, |_, last| now.duration_since(*last) > ttl)
                .is_some()
            {
                evicted += 1;
            }
        }

        if evicted == 0 {
            return 0;
        }

        let last_rebuild = *inner.last_rebuild.read().unwrap_or_else(|poisoned| {
            tracing::warn!("last_rebuild RwLock was poisoned, recovering");
            poisoned.into_inner()
        });
        if should_rebuild(evicted, entries_before, last_rebuild, now) {
            let mut limiter = inner.limiter.write().unwrap_or_else(|poisoned| {
                tracing::warn!("rate limiter RwLock was poisoned during rebuild, recovering");
                poisoned.into_inner()
            });
            *limiter = RateLimiter::dashmap(inner.quota);
            *inner.last_rebuild.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
            tracing::debug!(
                evicted,
                remaining = inner.last_access.len(),
                "Rebuilt rate limiter after cleanup"
            );
        } else {
            tracing::trace!(
                evicted,
                remaining = inner.last_access.len(),
                "Skipped rate limiter rebuild (below threshold)"
            );
        }

        inner.at_capacity_warned.store(false, Ordering::Relaxed);
        evicted
    }

    /// Number of tracked client IPs.
    pub fn entry_count(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.last_access.len())
    }

    fn warn_connect_info_missing(&self) {
        if let Some(inner) = &self.inner
            && !inner.connect_info_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                "ConnectInfo not available for rate limiting. All requests share the 'unknown' \
                 bucket. Serve with into_make_service_with_connect_info::<SocketAddr>()."
            );
        }
    }
}

/// Reason for rate limit rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Request exceeded rate limit.
    RateLimited,
    /// Rate limiter at capacity, cannot track new entries.
    AtCapacity,
}

/// Error returned when rate limit is exceeded.
#[derive(Debug)]
pub struct RateLimitError {
    /// Number of seconds to wait before retrying.
    pub retry_after_secs: u64,
    pub reason: RateLimitReason,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let (code, message) = match self.reason {
            RateLimitReason::RateLimited => (
                "rate_limit_exceeded",
                format!(
                    "Too many requests from this IP. Retry after {} seconds.",
                    self.retry_after_secs
                ),
            ),
            RateLimitReason::AtCapacity => (
                "rate_limiter_at_capacity",
                "Server is experiencing high load. Please retry later.".to_string(),
            ),
        };

        let body = serde_json::json!({
            "code": code,
            "message": message,
            "retry_after": self.retry_after_secs,
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", self.retry_after_secs.to_string())],
            axum::Json(body),
        )
            .into_response()
    }
}

fn extract_forwarded_ip(req: &Request<Body>) -> Option<String> {
    // First hop of X-Forwarded-For is the original client.
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(s) = forwarded.to_str()
        && let Some(ip) = s.split(',').next()
    {
        return Some(ip.trim().to_string());
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(s) = real_ip.to_str()
    {
        return Some(s.trim().to_string());
    }

    None
}

fn extract_connection_ip(req: &Request<Body>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Resolve the client IP, honouring `trusted_proxies`.
fn extract_ip(req: &Request<Body>, state: &RateLimitState) -> String {
    let Some(inner) = &state.inner else {
        return "unknown".to_string();
    };

    let connection_ip = extract_connection_ip(req);

    let trust_headers = match (&connection_ip, &inner.trusted_proxies) {
        (None, TrustedProxies::All) => true,
        // Can't verify the proxy without a connection IP.
        (None, _) => false,
        (Some(conn_ip), trusted_proxies) => trusted_proxies.is_trusted(conn_ip),
    };

    if trust_headers && let Some(forwarded_ip) = extract_forwarded_ip(req) {
        return forwarded_ip;
    }

    match connection_ip {
        Some(ip) => ip,
        None => {
            state.warn_connect_info_missing();
            "unknown".to_string()
        }
    }
}

/// Per-IP rate limiting middleware.
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !rate_limit.is_enabled() {
        return next.run(req).await;
    }

    let ip = extract_ip(&req, &rate_limit);

    match rate_limit.check_ip(&ip) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::debug!(ip = %ip, reason = ?e.reason, "Request rate limited");
            e.into_response()
        }
    }
}

/// Spawn a background task that periodically cleans up stale rate limiter entries.
pub fn spawn_cleanup_task(
    state: RateLimitState,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = state.cleanup();
            if evicted > 0 {
                tracing::info!(evicted, "Rate limiter cleanup task evicted stale entries");
            }
        }
    })
}
