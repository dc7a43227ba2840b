//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub monitoring: MonitoringConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Path that accepts the WebSocket upgrade
    pub ws_path: String,
    pub max_connections: usize,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Relay behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Largest WebSocket message accepted, in bytes
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before sends are dropped
    pub send_queue_capacity: usize,
    pub malformed_policy: MalformedPolicy,
}

/// What to do with a message that is not a JSON object with a `type`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log and discard, keep the connection open
    #[default]
    Drop,
    /// Close the sender with 1007
    Close,
}

impl FromStr for MalformedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(MalformedPolicy::Drop),
            "close" => Ok(MalformedPolicy::Close),
            other => anyhow::bail!("malformed_policy must be 'drop' or 'close', got '{}'", other),
        }
    }
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    /// Serve `/api/v1/health` and `/api/v1/status`
    pub status_api: bool,
    /// Serve `/metrics`
    pub prometheus_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ws_path: "/".to_string(),
            max_connections: 1024,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1024 * 1024,
            send_queue_capacity: 64,
            malformed_policy: MalformedPolicy::Drop,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            status_api: true,
            prometheus_enabled: true,
        }
    }
}
