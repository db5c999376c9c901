//! Batch upload endpoint.

use crate::error::ApiResult;
use crate::ingest;
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

/// Message returned when a batch completes, even if some files failed.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Frames uploaded successfully";

/// POST /upload
///
/// Scans the configured frames directory and upserts every frame file. The
/// request body is ignored. Per-file failures are reported in the summary
/// line; only an unreadable directory turns into an error response.
pub async fn upload_frames(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let report = ingest::upload_frames(
        state.metadata.as_ref(),
        &state.config.server.frames_dir,
        state.config.upload.concurrency,
    )
    .await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{UPLOAD_SUCCESS_MESSAGE}\n{}\n", report.summary()),
    ))
}
