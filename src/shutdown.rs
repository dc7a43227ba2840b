//! Graceful Shutdown Handling
//!
//! Waits for SIGTERM/SIGINT, then closes every signaling connection with
//! "going away" and gives the connection tasks time to drain.

use crate::connection::ConnectionManager;
use crate::Result;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{info, warn};

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// How long connections get to drain
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start listening for shutdown signals (SIGTERM, SIGINT)
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        Ok(())
    }

    /// Close all connections and wait for them to drain
    pub async fn shutdown_connection_manager(
        &self,
        connection_manager: &ConnectionManager,
    ) -> Result<()> {
        let start_time = Instant::now();
        let open = connection_manager.get_active_connections();
        info!(
            "Closing {} open connections (timeout: {:?})",
            open, self.timeout
        );

        connection_manager.initiate_shutdown();

        match connection_manager
            .wait_for_connections_to_close(self.timeout)
            .await
        {
            Ok(()) => info!(
                "All connections closed gracefully in {:?}",
                start_time.elapsed()
            ),
            Err(e) => warn!("Giving up on connection drain: {}", e),
        }

        Ok(())
    }
}
