//! Carlot - a command-line inventory manager for car listings.
//!
//! Talks to the car API when it is reachable and keeps working from a
//! local collection when it is not. Every command reports which source
//! served it.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use carlot_core::{ApiClient, Config, FileStore, Inventory};

use commands::Command;

/// Log file name inside the data directory
const LOG_FILE: &str = "carlot.log";

#[derive(Debug, Parser)]
#[command(name = "carlot", version, about = "Manage a car inventory, online or offline")]
struct Cli {
    /// Car collection endpoint (overrides config and CARLOT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for local storage and logs (overrides config and CARLOT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
/// Returns the guard that flushes the file log on drop.
fn init_tracing(log_dir: &std::path::Path) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_result = Config::load();
    let mut config = config_result.as_ref().cloned().unwrap_or_default();
    config.apply_env();
    config.apply_overrides(cli.api_url.clone(), cli.data_dir.clone());

    let _log_guard = init_tracing(&config.data_dir()?);
    if let Err(e) = config_result {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(api_url = config.api_url(), "Carlot starting");

    let storage_dir = config.storage_dir()?;
    let store = FileStore::new(storage_dir.clone())
        .with_context(|| format!("Failed to open local storage at {}", storage_dir.display()))?;
    let client = ApiClient::with_timeout(config.api_url(), config.request_timeout())
        .context("Failed to create API client")?;

    let inventory = Inventory::new(client, store);
    commands::run(&inventory, &config, cli.command).await
}
