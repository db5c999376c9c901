//! Database models mapping to the frame store schema.

use radar_core::FrameNumber;
use sqlx::FromRow;
use time::OffsetDateTime;

/// One row of `radar_frames`.
#[derive(Debug, Clone, FromRow)]
pub struct FrameRow {
    /// Surrogate key assigned on first insert; never changes afterwards.
    pub id: i64,
    pub frame_number: i64,
    /// Most recently uploaded payload.
    pub data: String,
    /// Time of first insert. Overwrites leave it untouched.
    pub created_at: OffsetDateTime,
}

impl FrameRow {
    /// Typed frame number of this row.
    pub fn number(&self) -> radar_core::Result<FrameNumber> {
        FrameNumber::try_from(self.frame_number)
    }
}
