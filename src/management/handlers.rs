//! Management API Handlers

use super::types::*;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::relay::RelayEngine;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<RelayEngine>,
    pub metrics: Arc<Metrics>,
    /// Open WebSocket connections, used for the connection limit
    pub open_sockets: Arc<AtomicUsize>,
    pub shutting_down: Arc<AtomicBool>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let engine = Arc::new(RelayEngine::new(&config.relay, Arc::clone(&metrics)));
        Self {
            config,
            engine,
            metrics,
            open_sockets: Arc::new(AtomicUsize::new(0)),
            shutting_down: Arc::new(AtomicBool::new(false)),
            start_time: SystemTime::now(),
        }
    }

    fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Health check handler
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let mut checks = HashMap::new();

    let draining = state.shutting_down.load(Ordering::Relaxed);
    checks.insert(
        "server".to_string(),
        CheckResult {
            status: if draining { "draining" } else { "healthy" }.to_string(),
            message: Some(if draining {
                "Server is shutting down".to_string()
            } else {
                "Server is running".to_string()
            }),
        },
    );

    let open = state.open_sockets.load(Ordering::Relaxed);
    let max = state.config.server.max_connections;
    checks.insert(
        "capacity".to_string(),
        CheckResult {
            status: if open < max { "healthy" } else { "saturated" }.to_string(),
            message: Some(format!("{} of {} connections in use", open, max)),
        },
    );

    let healthy = checks.values().all(|c| c.status == "healthy");
    let health = HealthStatus {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        checks,
        timestamp: SystemTime::now(),
    };

    let code = if draining {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(ApiResponse::success(health)))
}

/// Get session occupancy and server counters
pub async fn get_session_status(State(state): State<AppState>) -> Json<ApiResponse<SessionStatus>> {
    let snapshot = state.engine.snapshot();

    let status = SessionStatus {
        broadcaster_connected: snapshot.broadcaster_connected(),
        viewer_connected: snapshot.viewer_connected(),
        session_connections: snapshot.connections,
        open_sockets: state.open_sockets.load(Ordering::Relaxed),
        total_connections: state.metrics.get_total_connections(),
        messages_relayed: state.metrics.get_messages_relayed(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(status))
}

/// Prometheus scrape endpoint
pub async fn export_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.export_prometheus(),
    )
}
