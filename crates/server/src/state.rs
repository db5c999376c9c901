//! Application state shared across handlers.

use crate::ratelimit::RateLimitState;
use radar_core::config::AppConfig;
use radar_metadata::MetadataStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Frame store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Rate limiting state.
    pub rate_limit: RateLimitState,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The configuration is expected to have passed [`AppConfig::validate`].
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> Self {
        let rate_limit = RateLimitState::new(&config.rate_limit);

        Self {
            config: Arc::new(config),
            metadata,
            rate_limit,
        }
    }

    /// Get the cleanup interval for the rate limiter, if enabled.
    /// A zero interval falls back to 60 seconds since `tokio::time::interval` panics on zero.
    pub fn rate_limit_cleanup_interval(&self) -> Option<Duration> {
        if !self.rate_limit.is_enabled() {
            return None;
        }
        match self.config.rate_limit.cleanup_interval_secs {
            0 => {
                tracing::warn!("rate_limit.cleanup_interval_secs is 0, using default of 60 seconds");
                Some(Duration::from_secs(60))
            }
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
