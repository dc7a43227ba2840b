//! Management API Types

use serde::Serialize;
use std::collections::HashMap;
use std::time::SystemTime;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub timestamp: SystemTime,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: SystemTime::now(),
        }
    }
}

/// Health check result
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub checks: HashMap<String, CheckResult>,
    pub timestamp: SystemTime,
}

/// Individual health check result
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: Option<String>,
}

/// Occupancy of the signaling session plus server counters
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub broadcaster_connected: bool,
    pub viewer_connected: bool,
    /// Connections known to the session, identified or not
    pub session_connections: usize,
    pub open_sockets: usize,
    pub total_connections: u64,
    pub messages_relayed: u64,
    pub uptime_seconds: u64,
    pub version: String,
}
