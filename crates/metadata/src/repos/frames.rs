//! Frame repository trait.

use crate::error::MetadataResult;
use crate::models::FrameRow;
use async_trait::async_trait;
use radar_core::FrameNumber;

/// Repository for frame rows.
#[async_trait]
pub trait FrameRepo: Send + Sync {
    /// Insert a frame, or replace only the payload of the existing row with
    /// the same frame number. Atomic per call.
    async fn upsert_frame(&self, frame_number: FrameNumber, data: &str) -> MetadataResult<()>;

    /// Get a single frame by number.
    async fn get_frame(&self, frame_number: FrameNumber) -> MetadataResult<Option<FrameRow>>;

    /// List frames ordered by frame number ascending, skipping `offset` rows
    /// and returning at most `limit`.
    async fn list_frames(&self, limit: u32, offset: u64) -> MetadataResult<Vec<FrameRow>>;

    /// Total number of stored frames.
    async fn count_frames(&self) -> MetadataResult<u64>;
}

/// Offsets beyond `i64::MAX` cannot be bound; they select no rows anyway.
pub(crate) fn offset_param(offset: u64) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

pub(crate) fn count_from_row(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
