//! Connection Manager Implementation

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::socket::ws_handler;
use crate::management::{AppState, ManagementApi};
use crate::Result;

/// Owns the HTTP listener, the WebSocket endpoint and the shared relay state
pub struct ConnectionManager {
    config: Arc<Config>,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new(config: Arc<Config>) -> Self {
        let state = AppState::new(Arc::clone(&config));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Shared state handed to every request
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Signaling endpoint plus the enabled monitoring routes
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config.server.ws_path, get(ws_handler))
            .merge(ManagementApi::create_router(&self.config.monitoring))
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown
    pub async fn start(&self) -> Result<()> {
        let bind_addr = self.config.server.bind_addr;

        info!("Binding listener to {}", bind_addr);
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", bind_addr))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr: SocketAddr = listener.local_addr()?;
        info!(
            "Signaling relay listening on {} (WebSocket path {})",
            local_addr, self.config.server.ws_path
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                debug!("HTTP listener received shutdown signal");
            })
            .await
            .context("Signaling server failed")?;

        info!("Listener stopped");
        Ok(())
    }

    /// Stop accepting upgrades and close every live connection with 1001
    pub fn initiate_shutdown(&self) {
        if self.state.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Initiating connection manager shutdown");
        self.state.engine.shutdown();
        self.shutdown_tx.send_replace(true);
    }

    /// Open WebSocket connections
    pub fn get_active_connections(&self) -> usize {
        self.state.open_sockets.load(Ordering::Relaxed)
    }

    /// Wait until every connection task has finished or the timeout expires
    pub async fn wait_for_connections_to_close(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        while self.get_active_connections() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    "Shutdown timeout of {:?} reached with {} connections still open",
                    timeout,
                    self.get_active_connections()
                );
                anyhow::bail!("connections still open after {:?}", timeout);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("All connections closed");
        Ok(())
    }
}
