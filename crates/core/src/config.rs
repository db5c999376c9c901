//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory scanned by `POST /upload`, relative to the working directory.
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,
    /// Directory of static assets served for unmatched routes.
    /// Ignored when the directory does not exist.
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<PathBuf>,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Add hardening headers (CSP, HSTS, nosniff, ...) to every response (default: true).
    #[serde(default = "default_true")]
    pub security_headers: bool,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_frames_dir() -> PathBuf {
    PathBuf::from(crate::DEFAULT_FRAMES_DIR)
}

fn default_static_dir() -> Option<PathBuf> {
    Some(PathBuf::from("public"))
}

fn default_true() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            frames_dir: default_frames_dir(),
            static_dir: default_static_dir(),
            metrics_enabled: true,
            security_headers: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Upload batch configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum number of frame files read and stored at the same time.
    #[serde(default = "default_upload_concurrency")]
    pub concurrency: usize,
}

fn default_upload_concurrency() -> usize {
    crate::DEFAULT_UPLOAD_CONCURRENCY
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_upload_concurrency(),
        }
    }
}

/// Frame listing configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Page size used when the request has no usable `limit`.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

fn default_page_size() -> u32 {
    crate::DEFAULT_PAGE_SIZE
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

/// TLS mode for network database connections.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Disable TLS entirely.
    Disable,
    /// Prefer TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require TLS for all connections.
    Require,
}

/// Frame store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (testing and single-node deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Seconds to wait for a free pooled connection before failing.
        #[serde(default = "default_acquire_timeout_secs")]
        acquire_timeout_secs: u64,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_pg_port")]
        port: u16,
        username: Option<String>,
        /// WARNING: Prefer RADAR_METADATA__PASSWORD over storing this in a file.
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<SslMode>,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        #[serde(default = "default_acquire_timeout_secs")]
        acquire_timeout_secs: u64,
    },
    /// MySQL / MariaDB database.
    Mysql {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_mysql_port")]
        port: u16,
        username: Option<String>,
        /// WARNING: Prefer RADAR_METADATA__PASSWORD over storing this in a file.
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<SslMode>,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        #[serde(default = "default_acquire_timeout_secs")]
        acquire_timeout_secs: u64,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_pg_port() -> u16 {
    5432
}

fn default_mysql_port() -> u16 {
    3306
}

impl MetadataConfig {
    /// SQLite store at `path` with default pool settings.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite {
            path: path.into(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }

    /// Validate that every required connection setting is present.
    pub fn validate(&self) -> crate::Result<()> {
        let missing: Vec<&str> = match self {
            MetadataConfig::Sqlite { .. } => Vec::new(),
            MetadataConfig::Postgres { url: Some(_), .. }
            | MetadataConfig::Mysql { url: Some(_), .. } => Vec::new(),
            MetadataConfig::Postgres { host, database, .. } => [
                ("host", host.is_none()),
                ("database", database.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect(),
            MetadataConfig::Mysql {
                host,
                username,
                password,
                database,
                ..
            } => [
                ("host", host.is_none()),
                ("username", username.is_none()),
                ("password", password.is_none()),
                ("database", database.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect(),
        };

        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::Config(format!(
                "{} config requires 'url' or these missing settings: {}",
                self.backend_name(),
                missing.join(", ")
            )))
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            MetadataConfig::Sqlite { .. } => "sqlite",
            MetadataConfig::Postgres { .. } => "postgres",
            MetadataConfig::Mysql { .. } => "mysql",
        }
    }
}

/// Per-IP rate limiting configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requests allowed per client IP within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Trusted proxy IP addresses/CIDR ranges.
    /// Only requests from these IPs have X-Forwarded-For/X-Real-IP trusted.
    /// Use ["*"] to trust all proxies (NOT recommended for production).
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// Maximum number of tracked client IPs before new ones are rejected.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Interval in seconds between cleanup sweeps of stale entries.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Entries not seen within this many seconds are evicted during cleanup.
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_max_entries() -> u32 {
    100_000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_entry_ttl_secs() -> u64 {
    30 * 60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trusted_proxies: Vec::new(),
            max_entries: default_max_entries(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            entry_ttl_secs: default_entry_ttl_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration.
    /// Returns warnings for settings that are allowed but risky,
    /// and an error for settings that cannot work.
    pub fn validate(&self) -> crate::Result<Vec<String>> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        if self.max_requests == 0 {
            return Err(crate::Error::Config(
                "rate_limit.max_requests must be at least 1".to_string(),
            ));
        }

        if self.window_secs == 0 {
            return Err(crate::Error::Config(
                "rate_limit.window_secs must be at least 1".to_string(),
            ));
        }

        // tokio::time::interval panics on a zero period
        if self.cleanup_interval_secs == 0 {
            return Err(crate::Error::Config(
                "rate_limit.cleanup_interval_secs must be at least 1".to_string(),
            ));
        }

        if self.trusted_proxies.len() == 1 && self.trusted_proxies[0] == "*" {
            warnings.push(
                "rate_limit.trusted_proxies=['*'] trusts ALL forwarded headers. \
                 Clients can spoof their IP address and bypass rate limits."
                    .to_string(),
            );
        }

        if self.entry_ttl_secs < self.window_secs {
            warnings.push(format!(
                "rate_limit.entry_ttl_secs={} is shorter than window_secs={}. \
                 Entries may be evicted before their window resets.",
                self.entry_ttl_secs, self.window_secs
            ));
        }

        Ok(warnings)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Frame store configuration (required).
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Validate the whole configuration, returning non-fatal warnings.
    pub fn validate(&self) -> crate::Result<Vec<String>> {
        self.metadata.validate()?;

        if self.upload.concurrency == 0 {
            return Err(crate::Error::Config(
                "upload.concurrency must be at least 1".to_string(),
            ));
        }

        if self.frames.default_page_size == 0 {
            return Err(crate::Error::Config(
                "frames.default_page_size must be at least 1".to_string(),
            ));
        }

        self.rate_limit.validate()
    }

    /// Create a test configuration backed by a SQLite file.
    ///
    /// **For testing only.** Rate limiting is disabled and no static
    /// directory is served.
    pub fn for_testing(db_path: impl Into<PathBuf>, frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                frames_dir: frames_dir.into(),
                static_dir: None,
                ..Default::default()
            },
            metadata: MetadataConfig::sqlite(db_path),
            upload: UploadConfig::default(),
            frames: FramesConfig::default(),
            rate_limit: RateLimitConfig {
                enabled: false,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::{Env, Format, Toml};

    #[test]
    fn server_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.bind, "0.0.0.0:3000");
        assert_eq!(server.frames_dir, PathBuf::from("radar_frames"));
        assert_eq!(server.max_body_bytes, 1024 * 1024);

        assert_eq!(FramesConfig::default().default_page_size, 300);
        assert_eq!(UploadConfig::default().concurrency, 10);

        let rate = RateLimitConfig::default();
        assert!(rate.enabled);
        assert_eq!(rate.max_requests, 100);
        assert_eq!(rate.window_secs, 900);
    }

    #[test]
    fn metadata_is_required() {
        let result: Result<AppConfig, _> = serde_json::from_str(r#"{"server": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn mysql_missing_settings_are_listed() {
        let json = r#"{"type":"mysql","host":"db","database":"radar"}"#;
        let config: MetadataConfig = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mysql"));
        assert!(err.contains("username"));
        assert!(err.contains("password"));
        assert!(!err.contains("host,"));
    }

    #[test]
    fn mysql_url_is_sufficient() {
        let json = r#"{"type":"mysql","url":"mysql://u:p@db/radar"}"#;
        let config: MetadataConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        match config {
            MetadataConfig::Mysql {
                port,
                max_connections,
                ..
            } => {
                assert_eq!(port, 3306);
                assert_eq!(max_connections, 10);
            }
            _ => panic!("expected mysql config"),
        }
    }

    #[test]
    fn postgres_requires_host_and_database() {
        let json = r#"{"type":"postgres","host":"db"}"#;
        let config: MetadataConfig = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("database"));
    }

    #[test]
    fn rate_limit_zero_cleanup_interval_is_rejected() {
        let config = RateLimitConfig {
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rate_limit_disabled_skips_validation() {
        let config = RateLimitConfig {
            enabled: false,
            max_requests: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn rate_limit_wildcard_proxy_warns() {
        let config = RateLimitConfig {
            trusted_proxies: vec!["*".to_string()],
            ..Default::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn app_config_rejects_zero_concurrency() {
        let mut config = AppConfig::for_testing("test.db", "frames");
        config.upload.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_toml_and_prefixed_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "server.toml",
                r#"
                [server]
                bind = "127.0.0.1:4000"

                [metadata]
                type = "mysql"
                host = "db.internal"
                database = "radar"
                "#,
            )?;
            jail.set_env("RADAR_METADATA__USERNAME", "radar");
            jail.set_env("RADAR_METADATA__PASSWORD", "secret");
            jail.set_env("RADAR_FRAMES__DEFAULT_PAGE_SIZE", "50");

            let config: AppConfig = Figment::new()
                .merge(Toml::file("server.toml"))
                .merge(Env::prefixed("RADAR_").split("__"))
                .extract()?;

            assert_eq!(config.server.bind, "127.0.0.1:4000");
            assert_eq!(config.frames.default_page_size, 50);
            assert!(config.validate().is_ok());
            match config.metadata {
                MetadataConfig::Mysql {
                    username, password, ..
                } => {
                    assert_eq!(username.as_deref(), Some("radar"));
                    assert_eq!(password.as_deref(), Some("secret"));
                }
                _ => panic!("expected mysql config"),
            }
            Ok(())
        });
    }

    #[test]
    fn example_config_parses() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("RADAR_METADATA__PASSWORD", "secret");

            let config: AppConfig = Figment::new()
                .merge(Toml::string(include_str!(
                    "../../../config/server.example.toml"
                )))
                .merge(Env::prefixed("RADAR_").split("__"))
                .extract()?;

            assert_eq!(config.metadata.backend_name(), "mysql");
            assert_eq!(config.frames.default_page_size, 300);
            assert_eq!(config.rate_limit.window_secs, 900);
            assert!(config.validate().is_ok());
            Ok(())
        });
    }
}
