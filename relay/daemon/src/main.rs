//! Panel Daemon - Event Relay Server
//!
//! Entry point for panel-relay. Loads the configuration, builds and
//! initializes the frontend, then serves panel events until signalled.
//!
//! # Usage
//!
//! ```bash
//! # Start with the default config file (or built-in defaults)
//! panel-daemon
//!
//! # Explicit config file and port
//! panel-daemon --config /etc/panel-relay/config.toml --port 8080
//!
//! # Log-only frontend, whatever the config says
//! panel-daemon --console
//!
//! # Verbose logging
//! RUST_LOG=debug panel-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown, then frontend cleanup

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use panel_core::{load_config, load_config_from_path, Frontend, RelayConfig};
use panel_daemon::Server;

/// Panel Daemon - relays panel events to local output capabilities
#[derive(Parser, Debug)]
#[command(name = "panel-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (TOML or JSON)
    #[arg(short = 'c', long, env = "PANEL_RELAY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen port, overriding the config file and PANEL_RELAY_PORT
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Use the log-only frontend
    #[arg(long)]
    console: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PANEL_RELAY_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("panel_daemon={level},panel_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Resolve the configuration from the file, environment and flags
fn resolve_config(args: &Args) -> Result<RelayConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };

    if let Some(port) = args.port {
        config.apply_cli_port(port);
        info!(port, "Port overridden from command line");
    }
    if args.console {
        config.apply_cli_console();
        info!("Using log-only frontend from command line");
    }

    info!(
        source = ?config.source(),
        path = ?config.config_file_path,
        port = config.server.port,
        "Configuration resolved"
    );
    Ok(config)
}

/// Wait for SIGTERM, SIGINT, or the server exiting on its own
async fn wait_for_stop(exited: oneshot::Receiver<()>) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
        _ = exited => warn!("Server exited before a shutdown was requested"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(&args.log_level);

    info!("Panel daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    let config = resolve_config(&args)?;

    let mut frontend =
        Frontend::from_config(&config.frontend).context("Failed to build frontend")?;
    frontend
        .init(&config.frontend)
        .await
        .context("Failed to initialize frontend")?;
    let frontend = Arc::new(frontend);

    let server = Arc::new(Server::new(config.server.clone(), Arc::clone(&frontend)));
    let (exited_tx, exited_rx) = oneshot::channel();
    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.listen_and_serve(exited_tx).await })
    };

    let stop = wait_for_stop(exited_rx).await;

    // Stop serving before tearing down capabilities
    let shutdown = server.shutdown(config.server.shutdown_timeout).await;
    if let Err(e) = &shutdown {
        warn!(error = %e, "Abandoning in-flight requests");
        serving.abort();
    }
    let served = match serving.await {
        Ok(result) => result.context("Server failed"),
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(anyhow::anyhow!("Server task failed: {e}")),
    };

    info!("Cleaning up frontend");
    let cleanup = frontend.cleanup().await;
    if let Err(e) = &cleanup {
        error!(error = %e, "Frontend cleanup incomplete");
    }

    let result = stop
        .and(served)
        .and(shutdown.context("Graceful shutdown failed"))
        .and(cleanup.context("Frontend cleanup failed"));
    match result {
        Ok(()) => {
            info!("Panel daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Panel daemon stopped with error");
            Err(e)
        }
    }
}
