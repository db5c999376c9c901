//! PostgreSQL-specific integration tests using testcontainers.
//!
//! Backend-agnostic behaviour lives in `metadata_tests.rs`; these cover the
//! connection paths and the constraints only the PostgreSQL schema carries.
//! They require Docker to be running. Set SKIP_POSTGRES_TESTS=1 to skip.

mod common;

use common::postgres_or_skip;
use radar_core::FrameNumber;
use radar_core::config::{MetadataConfig, SslMode};
use radar_metadata::{ConnectParams, FrameRepo, MetadataStore, PoolSettings, PostgresStore};
use std::time::Duration;
use time::OffsetDateTime;

fn pool_settings() -> PoolSettings {
    PoolSettings {
        max_connections: 2,
        acquire_timeout: Duration::from_secs(10),
    }
}

#[tokio::test]
async fn test_postgres_connect_with_params() {
    let Some(metadata) = postgres_or_skip().await else {
        return;
    };

    let store = PostgresStore::from_params(
        ConnectParams {
            host: &metadata.host,
            port: metadata.port,
            username: Some("postgres"),
            password: Some("postgres"),
            database: "postgres",
            ssl_mode: Some(SslMode::Disable),
        },
        pool_settings(),
    )
    .await
    .expect("connect with individual parameters");

    store.health_check().await.unwrap();
    store.upsert_frame(FrameNumber::new(5), "via params").await.unwrap();

    // Both pools point at the same database.
    let row = metadata
        .store()
        .get_frame(FrameNumber::new(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.data, "via params");

    store.close().await;
}

#[tokio::test]
async fn test_postgres_from_config_url() {
    let Some(metadata) = postgres_or_skip().await else {
        return;
    };

    let config = MetadataConfig::Postgres {
        url: Some(format!(
            "postgres://postgres:postgres@{}:{}/postgres",
            metadata.host, metadata.port
        )),
        host: None,
        port: 5432,
        username: None,
        password: None,
        database: None,
        ssl_mode: None,
        max_connections: 2,
        acquire_timeout_secs: 10,
    };

    let store = radar_metadata::from_config(&config).await.unwrap();
    store.upsert_frame(FrameNumber::new(1), "one").await.unwrap();
    assert_eq!(store.count_frames().await.unwrap(), 1);
    store.close().await;
}

#[tokio::test]
async fn test_postgres_from_config_params() {
    let Some(metadata) = postgres_or_skip().await else {
        return;
    };

    let config = MetadataConfig::Postgres {
        url: None,
        host: Some(metadata.host.clone()),
        port: metadata.port,
        username: Some("postgres".to_string()),
        password: Some("postgres".to_string()),
        database: Some("postgres".to_string()),
        ssl_mode: Some(SslMode::Prefer),
        max_connections: 2,
        acquire_timeout_secs: 10,
    };

    let store = radar_metadata::from_config(&config).await.unwrap();
    store.health_check().await.unwrap();
    store.close().await;
}

#[tokio::test]
async fn test_postgres_rejects_frame_numbers_outside_u32() {
    let Some(metadata) = postgres_or_skip().await else {
        return;
    };

    for bad in [-1i64, i64::from(u32::MAX) + 1] {
        let result = sqlx::query("INSERT INTO radar_frames (frame_number, data) VALUES ($1, $2)")
            .bind(bad)
            .bind("out of range")
            .execute(metadata.pool())
            .await;
        assert!(result.is_err(), "frame_number {bad} should be rejected");
    }

    assert_eq!(metadata.store().count_frames().await.unwrap(), 0);
}

#[tokio::test]
async fn test_postgres_created_at_is_recent() {
    let Some(metadata) = postgres_or_skip().await else {
        return;
    };
    let store = metadata.store();

    let before = OffsetDateTime::now_utc() - time::Duration::seconds(5);
    store.upsert_frame(FrameNumber::new(9), "ts").await.unwrap();
    let row = store.get_frame(FrameNumber::new(9)).await.unwrap().unwrap();

    assert!(row.created_at >= before);
    assert!(row.created_at <= OffsetDateTime::now_utc() + time::Duration::seconds(5));
}
