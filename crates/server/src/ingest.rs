//! Upload and query services.
//!
//! `upload_frames` scans a directory for `frame_<N>.txt` files and upserts
//! each one into the store; `list_frames` serves frame-number-ordered pages.
//! Both take the store handle explicitly so they can be driven from the HTTP
//! handlers and from tests alike.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use futures::StreamExt;
use radar_core::{FailureStage, FrameNumber, FrameOutcome, UploadReport, parse_frame_file_name};
use radar_metadata::{FrameRow, MetadataStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::OffsetDateTime;

/// A directory entry whose name matched the frame pattern.
struct FrameFile {
    frame_number: FrameNumber,
    file_name: String,
    path: PathBuf,
}

/// Upload every `frame_<N>.txt` file in `dir` into the store.
///
/// Non-matching entries are counted as skipped. Per-file read and store
/// failures are recorded in the report and do not abort the batch; at most
/// `concurrency` files are in flight at once. Only a failure to list `dir`
/// itself is returned as an error.
pub async fn upload_frames(
    store: &dyn MetadataStore,
    dir: &Path,
    concurrency: usize,
) -> ApiResult<UploadReport> {
    let started = Instant::now();
    let (files, skipped) = scan_frames_dir(dir).await?;

    tracing::info!(
        dir = %dir.display(),
        matched = files.len(),
        skipped,
        "Uploading frames"
    );

    let outcomes: Vec<FrameOutcome> = futures::stream::iter(files)
        .map(|file| upload_one(store, file))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let report = UploadReport::new(outcomes, skipped);

    metrics::UPLOAD_BATCHES.inc();
    metrics::FILES_SKIPPED.inc_by(report.skipped as u64);
    metrics::UPLOAD_BATCH_DURATION.observe(started.elapsed().as_secs_f64());

    tracing::info!(
        uploaded = report.uploaded_count(),
        failed = report.failed_count(),
        skipped = report.skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Frame upload finished"
    );

    Ok(report)
}

async fn scan_frames_dir(dir: &Path) -> ApiResult<(Vec<FrameFile>, usize)> {
    let dir_error = |source: std::io::Error| ApiError::FramesDir {
        path: dir.display().to_string(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_error)?;
    let mut files = Vec::new();
    let mut skipped = 0usize;

    while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::debug!(name = ?name, "Skipping entry with non UTF-8 name");
            skipped += 1;
            continue;
        };
        match parse_frame_file_name(name) {
            Some(frame_number) => files.push(FrameFile {
                frame_number,
                file_name: name.to_string(),
                path: entry.path(),
            }),
            None => {
                tracing::debug!(name, "Skipping non-frame entry");
                skipped += 1;
            }
        }
    }

    Ok((files, skipped))
}

async fn upload_one(store: &dyn MetadataStore, file: FrameFile) -> FrameOutcome {
    let FrameFile {
        frame_number,
        file_name,
        path,
    } = file;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                frame_number = %frame_number,
                file = %file_name,
                error = %e,
                "Failed to read frame file"
            );
            metrics::record_frame_failure(FailureStage::Read);
            return FrameOutcome::failed(frame_number, file_name, FailureStage::Read, e.to_string());
        }
    };
    let data = String::from_utf8_lossy(&bytes);

    match store.upsert_frame(frame_number, &data).await {
        Ok(()) => {
            tracing::debug!(frame_number = %frame_number, bytes = bytes.len(), "Frame stored");
            metrics::FRAMES_UPSERTED.inc();
            FrameOutcome::uploaded(frame_number, file_name)
        }
        Err(e) => {
            tracing::error!(
                frame_number = %frame_number,
                file = %file_name,
                error = %e,
                "Failed to store frame"
            );
            metrics::record_frame_failure(FailureStage::Store);
            FrameOutcome::failed(frame_number, file_name, FailureStage::Store, e.to_string())
        }
    }
}

/// Normalized pagination parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Rows per page, always at least 1.
    pub limit: u32,
}

impl PageRequest {
    /// Build a page request from raw query values.
    ///
    /// Leading whitespace and a sign are accepted and parsing stops at the
    /// first non-digit, so `"2abc"` reads as 2. A missing,
    /// unparseable or non-positive value falls back to page 1 and
    /// `default_limit` respectively.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Self {
        let page = match page.and_then(parse_leading_int) {
            Some(n) if n > 0 => n as u64,
            _ => 1,
        };
        let limit = match limit.and_then(parse_leading_int) {
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => default_limit.max(1),
        };
        Self { page, limit }
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(u64::from(self.limit))
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    // Only digits remain, so the parse can fail on overflow alone.
    let magnitude = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// A stored frame as returned by the API.
#[derive(Clone, Debug, Serialize)]
pub struct FrameView {
    pub id: i64,
    pub frame_number: FrameNumber,
    pub data: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<FrameRow> for FrameView {
    type Error = ApiError;

    fn try_from(row: FrameRow) -> ApiResult<Self> {
        let frame_number = row.number()?;
        Ok(Self {
            id: row.id,
            frame_number,
            data: row.data,
            created_at: row.created_at,
        })
    }
}

/// One page of frames.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePage {
    pub frames: Vec<FrameView>,
    pub current_page: u64,
    pub total_frames: u64,
    /// True when the page came back full. A final page that is exactly
    /// full still reports `true`.
    pub has_more: bool,
}

/// Read one page of frames ordered by frame number, plus the total count.
///
/// The slice and the count are separate reads and may observe different
/// states of a table that is being written concurrently.
pub async fn list_frames(store: &dyn MetadataStore, request: PageRequest) -> ApiResult<FramePage> {
    let rows = store.list_frames(request.limit, request.offset()).await?;
    let total_frames = store.count_frames().await?;

    let has_more = rows.len() as u64 == u64::from(request.limit);
    let frames = rows
        .into_iter()
        .map(FrameView::try_from)
        .collect::<ApiResult<Vec<_>>>()?;

    metrics::FRAME_PAGES_SERVED.inc();

    Ok(FramePage {
        frames,
        current_page: request.page,
        total_frames,
        has_more,
    })
}
