//! DuoRelay - one-to-one WebSocket signaling relay

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duorelay::{config::ConfigManager, ConnectionManager, ShutdownCoordinator};

/// CLI arguments for DuoRelay
#[derive(Parser, Debug)]
#[command(name = "duorelay")]
#[command(about = "DuoRelay - one-to-one WebSocket signaling relay")]
#[command(version)]
#[command(long_about = "
DuoRelay - one-to-one WebSocket signaling relay

Pairs one broadcaster with one viewer and forwards their session-setup
messages (offers, answers, ICE candidates) verbatim.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  PORT                    - Listening port (default 8080)
  RELAY_BIND_ADDR         - Bind address (e.g., 0.0.0.0:8080)
  RELAY_MAX_CONNECTIONS   - Maximum concurrent WebSocket connections
  RELAY_MAX_MESSAGE_SIZE  - Largest accepted message in bytes
  RELAY_SHUTDOWN_TIMEOUT  - Drain timeout on shutdown (e.g., 10s)
  RELAY_MALFORMED_POLICY  - drop or close
  RELAY_LOG_LEVEL         - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "duorelay.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 0.0.0.0:8080)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Maximum number of concurrent connections
    #[arg(long, help = "Maximum number of concurrent connections")]
    pub max_connections: Option<usize>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > environment > config file > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    if let Some(level) = &args.log_level {
        config.monitoring.log_level = level.clone();
    }
    init_tracing(&args, &config.monitoring.log_level)?;

    info!(
        "Starting DuoRelay v{} - one-to-one signaling relay",
        env!("CARGO_PKG_VERSION")
    );
    if !args.config.exists() {
        info!(
            "Config file {} not found, using environment and defaults",
            args.config.display()
        );
    }

    config.merge_with_cli_args(args.bind.as_deref(), args.port, args.max_connections);

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  WebSocket path: {}", config.server.ws_path);
        info!("  Max connections: {}", config.server.max_connections);
        info!("  Max message size: {} bytes", config.relay.max_message_size);
        info!("  Malformed messages: {:?}", config.relay.malformed_policy);
        info!(
            "  Status API: {}",
            if config.monitoring.status_api {
                "enabled"
            } else {
                "disabled"
            }
        );
        return Ok(());
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);
    let connection_manager = Arc::new(ConnectionManager::new(Arc::new(config)));

    let mut server_handle = tokio::spawn({
        let manager = Arc::clone(&connection_manager);
        async move { manager.start().await }
    });

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    tokio::select! {
        result = shutdown_coordinator.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
            }
        }
        result = &mut server_handle => {
            // the listener only returns on its own when it failed
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::anyhow!("Server task failed: {}", e)),
            };
        }
    }

    info!("Initiating graceful shutdown...");
    shutdown_coordinator
        .shutdown_connection_manager(&connection_manager)
        .await?;

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) if !e.is_cancelled() => error!("Server task failed: {}", e),
        Err(_) => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, configured_level: &str) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        configured_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
