//! PostgreSQL-based frame store implementation.

use crate::error::MetadataResult;
use crate::models::FrameRow;
use crate::repos::FrameRepo;
use crate::repos::frames::{count_from_row, offset_param};
use crate::store::{ConnectParams, MetadataStore, PoolSettings, schema_statements};
use async_trait::async_trait;
use radar_core::FrameNumber;
use radar_core::config::SslMode;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

/// PostgreSQL-based frame store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(url: &str, pool: PoolSettings) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, pool).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// Lets the password arrive separately from the rest of the settings,
    /// e.g. through `RADAR_METADATA__PASSWORD`.
    pub async fn from_params(params: ConnectParams<'_>, pool: PoolSettings) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
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
                SslMode::Disable => PgSslMode::Disable,
                SslMode::Prefer => PgSslMode::Prefer,
                SslMode::Require => PgSslMode::Require,
            });
        }

        // Log connection info without password
        tracing::info!(
            host = params.host,
            port = params.port,
            database = params.database,
            username = params.username.unwrap_or("<none>"),
            ssl_mode = ?params.ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, pool).await
    }

    async fn connect(opts: PgConnectOptions, settings: PoolSettings) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared statement,
        // so we split the schema and execute each statement separately.
        for statement in schema_statements(POSTGRES_SCHEMA) {
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
impl FrameRepo for PostgresStore {
    async fn upsert_frame(&self, frame_number: FrameNumber, data: &str) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO radar_frames (frame_number, data, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (frame_number) DO UPDATE SET data = EXCLUDED.data
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
            "SELECT id, frame_number, data, created_at FROM radar_frames WHERE frame_number = $1",
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
            LIMIT $1 OFFSET $2
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_schema_has_one_statement() {
        let statements = schema_statements(POSTGRES_SCHEMA);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("-- Radar frame store schema"));
        assert!(statements[0].contains("CREATE TABLE IF NOT EXISTS radar_frames"));
    }
}
