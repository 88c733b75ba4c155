//! Server Pages
//!
//! An HTTP host for page handlers built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ dispatch::Dispatcher ──▶ routing ──▶ Page
//!                     (axum, ids,      (guard, scope,             (route     │
//!                      body limit)      params, errors)            table)    │
//!                                                                             ▼
//!     Client Response                                                      Content
//!     ◀────────────── http::connection ◀── http::response ◀───────────────────┘
//!                     (head + body        (cookies, compression,
//!                      channel)            ranges, redirects)
//!
//!     Cross-cutting: config, observability (tracing + metrics), lifecycle
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use server_pages::config::{self, PagesConfig};
use server_pages::lifecycle::{startup, Shutdown};
use server_pages::observability::logging;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "server-pages", version, about = "HTTP host for page handlers")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the log level (e.g. `debug`, `server_pages=trace`).
    #[arg(long)]
    log_level: Option<String>,
}

fn load(cli: &Cli) -> Result<PagesConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => PagesConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    config::validation::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("server-pages: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("server-pages: failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        "server-pages starting"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    match startup::start(config, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
