//! Frame store abstraction and implementations.
//!
//! One table, `radar_frames`, keyed by a unique frame number. Backends:
//! - SQLite (tests and single-node deployments)
//! - PostgreSQL
//! - MySQL / MariaDB

pub mod error;
pub mod models;
pub mod mysql;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::FrameRow;
pub use mysql::MySqlStore;
pub use postgres::PostgresStore;
pub use repos::FrameRepo;
pub use store::{ConnectParams, MetadataStore, PoolSettings, SqliteStore};

use radar_core::config::MetadataConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a frame store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    config
        .validate()
        .map_err(|e| MetadataError::Config(e.to_string()))?;

    match config {
        MetadataConfig::Sqlite {
            path,
            acquire_timeout_secs,
        } => {
            let store = SqliteStore::new(path, Duration::from_secs(*acquire_timeout_secs)).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            acquire_timeout_secs,
        } => {
            let pool = store::PoolSettings {
                max_connections: *max_connections,
                acquire_timeout: Duration::from_secs(*acquire_timeout_secs),
            };
            let store = if let Some(url) = url {
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, pool).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    store::ConnectParams {
                        host,
                        port: *port,
                        username: username.as_deref(),
                        password: password.as_deref(),
                        database,
                        ssl_mode: *ssl_mode,
                    },
                    pool,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Mysql {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            acquire_timeout_secs,
        } => {
            let pool = store::PoolSettings {
                max_connections: *max_connections,
                acquire_timeout: Duration::from_secs(*acquire_timeout_secs),
            };
            let store = if let Some(url) = url {
                tracing::info!("Connecting to MySQL using connection URL");
                MySqlStore::from_url(url, pool).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                MySqlStore::from_params(
                    store::ConnectParams {
                        host,
                        port: *port,
                        username: username.as_deref(),
                        password: password.as_deref(),
                        database,
                        ssl_mode: *ssl_mode,
                    },
                    pool,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "mysql config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
