//! Prometheus metrics for the radar server.
//!
//! Counters cover frame ingest and page reads. The `/metrics` endpoint is
//! unauthenticated; restrict it at the network level when exposed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use radar_core::FailureStage;
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static FRAMES_UPSERTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "radar_frames_upserted_total",
        "Total number of frames inserted or overwritten",
    )
    .expect("metric creation failed")
});

pub static FRAME_UPLOAD_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "radar_frame_upload_failures_total",
            "Total frame files that failed to upload, by stage",
        ),
        &["stage"],
    )
    .expect("metric creation failed")
});

pub static FILES_SKIPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "radar_files_skipped_total",
        "Total directory entries ignored because their name is not a frame file",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_BATCHES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "radar_upload_batches_total",
        "Total number of completed upload runs",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_BATCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "radar_upload_batch_duration_seconds",
            "Time taken to upload a whole frames directory",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

pub static FRAME_PAGES_SERVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "radar_frame_pages_served_total",
        "Total number of frame pages returned",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests may build as many routers as they like.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(FRAMES_UPSERTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FRAME_UPLOAD_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FILES_SKIPPED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_BATCHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_BATCH_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FRAME_PAGES_SERVED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Count one failed frame file.
pub fn record_frame_failure(stage: FailureStage) {
    FRAME_UPLOAD_FAILURES
        .with_label_values(&[stage.as_str()])
        .inc();
}
