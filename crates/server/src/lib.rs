//! HTTP server for the radar frame store.
//!
//! This crate provides:
//! - Batch ingest of `frame_<N>.txt` files from the frames directory
//! - Paginated, frame-number-ordered reads
//! - Health, metrics and static file endpoints

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use ingest::{FramePage, PageRequest};
pub use ratelimit::RateLimitState;
pub use routes::create_router;
pub use state::AppState;
