//! Radar frame store server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use radar_core::config::AppConfig;
use radar_server::{AppState, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// radard - ingests radar frame files and serves them paginated
#[derive(Parser, Debug)]
#[command(name = "radard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "RADAR_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from the optional TOML file and `RADAR_` environment variables.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    let has_config_file = std::path::Path::new(config_path).exists();

    if has_config_file {
        tracing::info!(config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path);
    }

    // RADAR_CONFIG only names the file.
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("RADAR_") && key != "RADAR_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: radard --config /path/to/config.toml\n  \
             2. Environment variables: RADAR_METADATA__TYPE=mysql RADAR_METADATA__HOST=db \
             RADAR_METADATA__USERNAME=radar RADAR_METADATA__PASSWORD=... \
             RADAR_METADATA__DATABASE=radar radard\n\n\
             See config/server.example.toml for example configuration.\n\
             Set RADAR_CONFIG env var to specify a default config file path."
        );
    }

    figment
        .merge(Env::prefixed("RADAR_").split("__"))
        .extract()
        .context("failed to load configuration")
}

/// Resolve once Ctrl-C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("radard v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    let warnings = config.validate().context("invalid configuration")?;
    for warning in warnings {
        tracing::warn!("Configuration warning: {}", warning);
    }

    let metadata = radar_metadata::from_config(&config.metadata)
        .await
        .with_context(|| {
            format!(
                "failed to initialize {} frame store",
                config.metadata.backend_name()
            )
        })?;
    tracing::info!(backend = config.metadata.backend_name(), "Frame store initialized");

    let state = AppState::new(config.clone(), metadata.clone());

    if let Some(cleanup_interval) = state.rate_limit_cleanup_interval() {
        radar_server::ratelimit::spawn_cleanup_task(state.rate_limit.clone(), cleanup_interval);
        tracing::info!(
            interval_secs = cleanup_interval.as_secs(),
            "Rate limiter cleanup task spawned"
        );
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!(
        frames_dir = %config.server.frames_dir.display(),
        "Listening on {}",
        addr
    );

    // ConnectInfo feeds the per-IP rate limiter.
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    metadata.close().await;
    tracing::info!("Frame store closed");

    Ok(())
}
