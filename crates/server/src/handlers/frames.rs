//! Frame read endpoints.

use crate::error::{ApiError, ApiResult};
use crate::ingest::{self, FramePage, FrameView, PageRequest};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use radar_core::FrameNumber;
use serde::Deserialize;

/// Raw `GET /frames` query. Values stay strings so that malformed numbers
/// fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct FramesQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /frames?page=&limit=
pub async fn list_frames(
    State(state): State<AppState>,
    Query(query): Query<FramesQuery>,
) -> ApiResult<Json<FramePage>> {
    let request = PageRequest::from_params(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.frames.default_page_size,
    );
    let page = ingest::list_frames(state.metadata.as_ref(), request).await?;
    Ok(Json(page))
}

/// GET /frames/{frame_number}
pub async fn get_frame(
    State(state): State<AppState>,
    Path(frame_number): Path<String>,
) -> ApiResult<Json<FrameView>> {
    let frame_number: FrameNumber = frame_number
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid frame number: {frame_number}")))?;

    let row = state
        .metadata
        .get_frame(frame_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("frame {frame_number}")))?;

    Ok(Json(FrameView::try_from(row)?))
}
