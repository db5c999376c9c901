//! MySQL / MariaDB frame store implementation.

use crate::error::MetadataResult;
use crate::models::FrameRow;
use crate::repos::FrameRepo;
use crate::repos::frames::{count_from_row, offset_param};
use crate::store::{ConnectParams, MetadataStore, PoolSettings, schema_statements};
use async_trait::async_trait;
use radar_core::FrameNumber;
use radar_core::config::SslMode;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};
use sqlx::{MySql, Pool};
use std::str::FromStr;
use time::OffsetDateTime;

const MYSQL_SCHEMA: &str = include_str!("mysql_schema.sql");

/// MySQL-based frame store.
pub struct MySqlStore {
    pool: Pool<MySql>,
}

impl MySqlStore {
    /// Create a new MySQL store from a connection URL.
    pub async fn from_url(url: &str, pool: PoolSettings) -> MetadataResult<Self> {
        let opts = MySqlConnectOptions::from_str(url)?;
        Self::connect(opts, pool).await
    }

    /// Create a new MySQL store from individual connection parameters.
    pub async fn from_params(params: ConnectParams<'_>, pool: PoolSettings) -> MetadataResult<Self> {
        let mut opts = MySqlConnectOptions::new()
            .host(params.host)
            .port(params.port)
            .database(params.database);

        if let Some(user) = params.username {
            opts = opts.username(user);
        }

        if let Some(pass) = params.password {
            opts = opts.password(pass);
        }

        if let Some(mode) = params.ssl_mode {
            opts = opts.ssl_mode(match mode {
                SslMode::Disable => MySqlSslMode::Disabled,
                SslMode::Prefer => MySqlSslMode::Preferred,
                SslMode::Require => MySqlSslMode::Required,
            });
        }

        tracing::info!(
            host = params.host,
            port = params.port,
            database = params.database,
            username = params.username.unwrap_or("<none>"),
            ssl_mode = ?params.ssl_mode,
            "Connecting to MySQL with individual parameters"
        );

        Self::connect(opts, pool).await
    }

    async fn connect(opts: MySqlConnectOptions, settings: PoolSettings) -> MetadataResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<MySql> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for MySqlStore {
    async fn migrate(&self) -> MetadataResult<()> {
        for statement in schema_statements(MYSQL_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
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
impl FrameRepo for MySqlStore {
    async fn upsert_frame(&self, frame_number: FrameNumber, data: &str) -> MetadataResult<()> {
        // VALUES() is deprecated on MySQL 8.0.20+ but still the only form MariaDB accepts.
        sqlx::query(
            r#"
            INSERT INTO radar_frames (frame_number, data, created_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE data = VALUES(data)
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
