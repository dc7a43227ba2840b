//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;

/// Routes served next to the WebSocket endpoint
const RESERVED_PATHS: &[&str] = &["/metrics", "/api/v1/health", "/api/v1/status"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, then overlay environment variables
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let mut config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.apply_env_overrides()?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            Self::load_from_env()
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Overlay environment variables onto this configuration
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind_addr) = std::env::var("RELAY_BIND_ADDR") {
            self.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid RELAY_BIND_ADDR: {}", bind_addr))?;
        }

        // PORT wins over the port part of RELAY_BIND_ADDR
        if let Ok(port) = std::env::var("PORT") {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", port))?;
            self.server.bind_addr.set_port(port);
        }

        if let Ok(max_conn) = std::env::var("RELAY_MAX_CONNECTIONS") {
            self.server.max_connections = max_conn
                .parse::<usize>()
                .with_context(|| format!("Invalid RELAY_MAX_CONNECTIONS: {}", max_conn))?;
        }

        if let Ok(timeout) = std::env::var("RELAY_SHUTDOWN_TIMEOUT") {
            self.server.shutdown_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid RELAY_SHUTDOWN_TIMEOUT: {}", timeout))?;
        }

        if let Ok(size) = std::env::var("RELAY_MAX_MESSAGE_SIZE") {
            self.relay.max_message_size = size
                .parse::<usize>()
                .with_context(|| format!("Invalid RELAY_MAX_MESSAGE_SIZE: {}", size))?;
        }

        if let Ok(policy) = std::env::var("RELAY_MALFORMED_POLICY") {
            self.relay.malformed_policy = policy
                .parse()
                .with_context(|| format!("Invalid RELAY_MALFORMED_POLICY: {}", policy))?;
        }

        if let Ok(log_level) = std::env::var("RELAY_LOG_LEVEL") {
            self.monitoring.log_level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_relay_config()
            .with_context(|| "Relay configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            bail!("max_connections must be greater than 0");
        }

        if self.server.max_connections > 100000 {
            bail!("max_connections cannot exceed 100,000 for safety");
        }

        if !self.server.ws_path.starts_with('/') {
            bail!("ws_path must start with '/'");
        }

        if RESERVED_PATHS.contains(&self.server.ws_path.as_str()) {
            bail!("ws_path '{}' collides with a monitoring route", self.server.ws_path);
        }

        if self.server.shutdown_timeout.as_secs() > 300 {
            bail!("shutdown_timeout cannot exceed 5 minutes");
        }

        Ok(())
    }

    fn validate_relay_config(&self) -> Result<()> {
        if self.relay.max_message_size < 1024 {
            bail!("max_message_size must be at least 1024 bytes");
        }

        if self.relay.max_message_size > 16 * 1024 * 1024 {
            bail!("max_message_size cannot exceed 16MB");
        }

        if self.relay.send_queue_capacity == 0 {
            bail!("send_queue_capacity must be greater than 0");
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "monitoring.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        max_connections: Option<usize>,
    ) {
        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(max_conn) = max_connections {
            self.server.max_connections = max_conn;
            tracing::info!("CLI override: max connections set to {}", max_conn);
        }
    }
}
