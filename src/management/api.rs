//! Management API Routes

use super::handlers::*;
use crate::config::MonitoringConfig;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

/// Management API router
pub struct ManagementApi;

impl ManagementApi {
    /// Monitoring routes enabled by the configuration
    pub fn create_router(monitoring: &MonitoringConfig) -> Router<AppState> {
        let mut router = Router::new();

        if monitoring.status_api {
            router = router
                .route("/api/v1/health", get(health_check))
                .route("/api/v1/status", get(get_session_status));
        }

        if monitoring.prometheus_enabled {
            router = router.route("/metrics", get(export_metrics));
        }

        router.layer(CorsLayer::permissive())
    }
}
