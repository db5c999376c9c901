//! Frame store trait and the SQLite implementation.

use crate::error::MetadataResult;
use crate::models::FrameRow;
use crate::repos::FrameRepo;
use crate::repos::frames::{count_from_row, offset_param};
use async_trait::async_trait;
use radar_core::FrameNumber;
use radar_core::config::SslMode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined frame store trait.
#[async_trait]
pub trait MetadataStore: FrameRepo + Send + Sync {
    /// Create the schema if it does not exist yet.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Close the connection pool, waiting for checked-out connections.
    async fn close(&self);
}

/// Connection pool sizing shared by the network backends.
#[derive(Clone, Copy, Debug)]
pub struct PoolSettings {
    /// Maximum connections in the pool.
    pub max_connections: u32,
    /// How long an operation waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

/// Individual connection parameters for the network backends.
#[derive(Clone, Copy, Debug)]
pub struct ConnectParams<'a> {
    pub host: &'a str,
    pub port: u16,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub database: &'a str,
    pub ssl_mode: Option<SslMode>,
}

/// Split an embedded schema into individual statements.
///
/// Network backends prepare one statement at a time. Chunks holding only
/// comments are dropped.
pub(crate) fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// SQLite-based frame store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store, creating the file and schema if needed.
    pub async fn new(path: impl AsRef<Path>, acquire_timeout: Duration) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        // SQLite permits a single writer; concurrent upserts queue on the pool instead.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "SQLite frame store opened");

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl FrameRepo for SqliteStore {
    async fn upsert_frame(&self, frame_number: FrameNumber, data: &str) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO radar_frames (frame_number, data, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(frame_number) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(frame_number.as_i64())
        .bind(data)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_frame(&self, frame_number: FrameNumber) -> MetadataResult<Option<FrameRow>> {
        let row = sqlx::query_as::<_, FrameRow>(
            "SELECT id, frame_number, data, created_at FROM radar_frames WHERE frame_number = ?",
        )
        .bind(frame_number.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_frames(&self, limit: u32, offset: u64) -> MetadataResult<Vec<FrameRow>> {
        let rows = sqlx::query_as::<_, FrameRow>(
            r#"
            SELECT id, frame_number, data, created_at FROM radar_frames
            ORDER BY frame_number
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(limit))
        .bind(offset_param(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_frames(&self) -> MetadataResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM radar_frames")
            .fetch_one(&self.pool)
            .await?;
        Ok(count_from_row(count))
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS radar_frames (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    frame_number INTEGER NOT NULL UNIQUE,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;
