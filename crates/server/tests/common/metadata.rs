//! Frame store test utilities.

use radar_metadata::{
    MetadataError, MetadataResult, MetadataStore, MySqlStore, PoolSettings, PostgresStore,
    SqliteStore,
};
use sqlx::{MySql, Pool, Postgres as SqlxPostgres, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::mysql::Mysql;
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for Docker/container startup failures in Postgres test setup.
/// Tests use this marker to decide whether to skip due to unavailable Docker.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// Same marker for the MySQL container.
pub const MYSQL_CONTAINER_START_ERR_PREFIX: &str = "mysql-container-start:";

fn test_pool() -> PoolSettings {
    PoolSettings {
        max_connections: 5,
        acquire_timeout: Duration::from_secs(30),
    }
}

/// A test SQLite store that cleans up on drop.
#[allow(dead_code)]
pub struct TestMetadata {
    pub store: Arc<dyn MetadataStore>,
    pub(crate) sqlite_store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

impl TestMetadata {
    /// Create a new SQLite store in a temp directory.
    pub async fn new() -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let store = Arc::new(SqliteStore::new(&db_path, Duration::from_secs(5)).await?);

        Ok(Self {
            store: store.clone(),
            sqlite_store: store,
            _temp_dir: temp_dir,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    /// Get a reference to the SQLite connection pool for raw queries.
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite_store.pool()
    }
}

/// PostgreSQL test store backed by a testcontainer.
#[allow(dead_code)]
pub struct PostgresTestMetadata {
    pub store: Arc<dyn MetadataStore>,
    pub(crate) postgres_store: Arc<PostgresStore>,
    pub host: String,
    pub port: u16,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestMetadata {
    pub async fn new() -> MetadataResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                MetadataError::Internal(format!(
                    "{} Failed to start PostgreSQL container: {e}",
                    POSTGRES_CONTAINER_START_ERR_PREFIX
                ))
            })?;

        let host = container
            .get_host()
            .await
            .expect("Failed to get host")
            .to_string();
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
        let store = Arc::new(PostgresStore::from_url(&url, test_pool()).await?);

        Ok(Self {
            store: store.clone(),
            postgres_store: store,
            host,
            port,
            _container: container,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<SqlxPostgres> {
        self.postgres_store.pool()
    }
}

/// MySQL test store backed by a testcontainer.
#[allow(dead_code)]
pub struct MySqlTestMetadata {
    pub store: Arc<dyn MetadataStore>,
    pub(crate) mysql_store: Arc<MySqlStore>,
    pub host: String,
    pub port: u16,
    _container: ContainerAsync<Mysql>,
}

impl MySqlTestMetadata {
    pub async fn new() -> MetadataResult<Self> {
        let container = Mysql::default().start().await.map_err(|e| {
            MetadataError::Internal(format!(
                "{} Failed to start MySQL container: {e}",
                MYSQL_CONTAINER_START_ERR_PREFIX
            ))
        })?;

        let host = container
            .get_host()
            .await
            .expect("Failed to get host")
            .to_string();
        let port = container
            .get_host_port_ipv4(3306)
            .await
            .expect("Failed to get port");

        // testcontainers-modules mysql: passwordless root, database "test"
        let url = format!("mysql://root@{}:{}/test", host, port);
        let store = Arc::new(MySqlStore::from_url(&url, test_pool()).await?);

        Ok(Self {
            store: store.clone(),
            mysql_store: store,
            host,
            port,
            _container: container,
        })
    }

    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<MySql> {
        self.mysql_store.pool()
    }
}

/// Start a PostgreSQL store, or `None` when Docker is unavailable or
/// SKIP_POSTGRES_TESTS is set. Other setup errors panic.
#[allow(dead_code)]
pub async fn postgres_or_skip() -> Option<PostgresTestMetadata> {
    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        return None;
    }
    match PostgresTestMetadata::new().await {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            let msg = err.to_string();
            if msg.contains(POSTGRES_CONTAINER_START_ERR_PREFIX) {
                eprintln!("Skipping PostgreSQL test (Docker unavailable): {msg}");
                None
            } else {
                panic!("PostgreSQL test setup failed: {msg}");
            }
        }
    }
}

/// Start a MySQL store, or `None` when Docker is unavailable or
/// SKIP_MYSQL_TESTS is set. Other setup errors panic.
#[allow(dead_code)]
pub async fn mysql_or_skip() -> Option<MySqlTestMetadata> {
    if std::env::var("SKIP_MYSQL_TESTS").is_ok() {
        return None;
    }
    match MySqlTestMetadata::new().await {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            let msg = err.to_string();
            if msg.contains(MYSQL_CONTAINER_START_ERR_PREFIX) {
                eprintln!("Skipping MySQL test (Docker unavailable): {msg}");
                None
            } else {
                panic!("MySQL test setup failed: {msg}");
            }
        }
    }
}

/// Run a test against every backend that is available.
#[allow(dead_code)]
pub async fn run_metadata_test_all<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn MetadataStore>) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestMetadata::new()
        .await
        .expect("Failed to create SQLite test metadata");
    test_fn.clone()(sqlite.store()).await;

    if let Some(postgres) = postgres_or_skip().await {
        test_fn.clone()(postgres.store()).await;
    }

    if let Some(mysql) = mysql_or_skip().await {
        test_fn(mysql.store()).await;
    }
}
