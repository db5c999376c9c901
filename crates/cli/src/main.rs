//! Upload client for the radar frame store.

mod api_client;

use anyhow::Result;
use api_client::{ApiClient, FramePage, UploadError};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_SERVER: &str = "http://localhost:3000";
const DATA_PREVIEW_CHARS: usize = 40;

#[derive(Parser)]
#[command(name = "radar-upload")]
#[command(about = "Trigger frame ingestion on a radar frame server and inspect the result")]
#[command(version)]
struct Cli {
    /// Frame server base URL
    #[arg(long, env = "RADAR_SERVER_URL", default_value = DEFAULT_SERVER, global = true)]
    server: String,

    /// Local frames directory that must contain frame files before uploading
    #[arg(long, default_value = "radar_frames", global = true)]
    frames_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the server to ingest its frames directory (default)
    Upload,
    /// Fetch one page of stored frames
    Frames {
        /// Page number (1-based)
        #[arg(long)]
        page: Option<u64>,
        /// Frames per page (server default when omitted)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Check server health and version
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        server,
        frames_dir,
        command,
    } = Cli::parse();

    let outcome = match command.unwrap_or(Commands::Upload) {
        Commands::Upload => {
            if !has_frame_files(&frames_dir).await {
                eprintln!("No frame files found. Run the generator first.");
                return Ok(ExitCode::FAILURE);
            }
            handle_upload(&server).await
        }
        Commands::Frames { page, limit } => handle_frames(&server, page, limit).await,
        Commands::Health => handle_health(&server).await,
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            report_failure(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// True when `dir` exists and holds at least one entry.
async fn has_frame_files(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Cannot read frames directory");
            false
        }
    }
}

async fn handle_upload(server: &str) -> Result<(), UploadError> {
    println!("Starting radar frames upload...");
    let client = ApiClient::new(server)?;
    let summary = client.upload().await?;
    println!("Upload successful: {}", summary.trim_end());
    Ok(())
}

async fn handle_frames(
    server: &str,
    page: Option<u64>,
    limit: Option<u32>,
) -> Result<(), UploadError> {
    let client = ApiClient::new(server)?;
    let frames = client.list_frames(page, limit).await?;
    render_page(&frames);
    Ok(())
}

async fn handle_health(server: &str) -> Result<(), UploadError> {
    let client = ApiClient::new(server)?;
    let health = client.health().await?;

    println!("Status: {}", health.status);
    println!("Server version: {}", health.version);
    println!("Client version: {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn render_page(page: &FramePage) {
    println!(
        "Page {}: {} of {} frames{}",
        page.current_page,
        page.frames.len(),
        page.total_frames,
        if page.has_more { " (more available)" } else { "" }
    );
    if page.frames.is_empty() {
        return;
    }

    println!("{:<12} {:>10} {:<26} DATA", "FRAME", "BYTES", "CREATED");
    println!("{}", "-".repeat(12 + 1 + 10 + 1 + 26 + 1 + DATA_PREVIEW_CHARS));
    for frame in &page.frames {
        println!(
            "{:<12} {:>10} {:<26} {}",
            frame.frame_number.to_string(),
            frame.data.len(),
            frame.created_at,
            preview(&frame.data)
        );
    }
}

/// First line of a payload, cut to a fixed number of characters.
fn preview(data: &str) -> String {
    let line = data.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(DATA_PREVIEW_CHARS).collect();
    if line.chars().count() > DATA_PREVIEW_CHARS || data.lines().nth(1).is_some() {
        out.push_str("...");
    }
    out
}

fn report_failure(err: &UploadError) {
    eprintln!("Request failed: {err}");
    match err {
        UploadError::Response { status, body } => {
            tracing::warn!(status = status.as_u16(), "Server rejected request");
            eprintln!("Response status: {status}");
            eprintln!("Response data: {}", body.trim_end());
        }
        UploadError::NoResponse(source) => {
            tracing::warn!(error = ?source, "Request sent but no response received");
            eprintln!("No response received. Is the server running?");
        }
        UploadError::Setup(reason) => {
            tracing::warn!(reason = %reason, "Request could not be built");
            eprintln!("Error setting up request: {reason}");
        }
        UploadError::Decode(source) => {
            tracing::warn!(error = %source, "Response body did not parse");
        }
    }
}
