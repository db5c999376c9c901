//! Server test utilities.

use radar_core::config::AppConfig;
use radar_metadata::{MetadataStore, SqliteStore};
use radar_server::{AppState, create_router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A test server wrapper with a temporary SQLite store and frames directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub frames_dir: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with default test configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let frames_dir = temp_dir.path().join("radar_frames");
        std::fs::create_dir_all(&frames_dir).expect("Failed to create frames directory");

        let db_path = temp_dir.path().join("frames.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path, Duration::from_secs(5))
                .await
                .expect("Failed to create frame store"),
        );

        let mut config = AppConfig::for_testing(db_path, &frames_dir);
        modifier(&mut config);

        let state = AppState::new(config, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            frames_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying frame store.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Write a file into the frames directory.
    pub fn write_file(&self, name: &str, contents: impl AsRef<[u8]>) {
        std::fs::write(self.frames_dir.join(name), contents).expect("Failed to write frame file");
    }
}
