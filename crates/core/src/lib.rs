//! Core domain types for the radar frame store.
//!
//! This crate defines the data model shared by the other crates:
//! - Frame numbers and the `frame_<digits>.txt` filename convention
//! - Per-file outcomes and the batch report of an upload run
//! - Application configuration

pub mod config;
pub mod error;
pub mod frame;
pub mod upload;

pub use error::{Error, Result};
pub use frame::{FrameNumber, frame_file_name, parse_frame_file_name};
pub use upload::{FailureStage, FrameOutcome, FrameStatus, UploadReport};

/// Default number of frames returned per page.
pub const DEFAULT_PAGE_SIZE: u32 = 300;

/// Default number of frame files processed concurrently during an upload.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 10;

/// Default directory scanned by the upload endpoint.
pub const DEFAULT_FRAMES_DIR: &str = "radar_frames";
