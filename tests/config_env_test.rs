//! Environment Override Integration Tests
//!
//! Kept in its own test binary: everything here mutates the process
//! environment, so it runs as a single sequential test.

use anyhow::Result;
use duorelay::config::{ConfigManager, MalformedPolicy};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_err;

const KEYS: [&str; 4] = [
    "RELAY_BIND_ADDR",
    "PORT",
    "RELAY_MALFORMED_POLICY",
    "RELAY_SHUTDOWN_TIMEOUT",
];

fn clear_env() {
    for key in KEYS {
        std::env::remove_var(key);
    }
}

#[test]
fn test_environment_overrides() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("duorelay.toml");
    fs::write(
        &config_path,
        "[server]\nbind_addr = \"0.0.0.0:8080\"\nmax_connections = 32\n",
    )?;

    // environment alone
    std::env::set_var("RELAY_BIND_ADDR", "127.0.0.1:5000");
    std::env::set_var("PORT", "5050");
    std::env::set_var("RELAY_MALFORMED_POLICY", "close");
    std::env::set_var("RELAY_SHUTDOWN_TIMEOUT", "2s");
    let from_env = ConfigManager::load_from_env();

    // PORT on top of an existing config file
    clear_env();
    std::env::set_var("PORT", "9999");
    let from_file = ConfigManager::load_from_file(&config_path);

    // CLI flags still win over PORT
    let mut from_cli = ConfigManager::load_from_file(&config_path);
    if let Ok(config) = from_cli.as_mut() {
        config.merge_with_cli_args(None, Some(7000), None);
    }

    clear_env();
    std::env::set_var("RELAY_MALFORMED_POLICY", "sometimes");
    let invalid_env = ConfigManager::load_from_env();
    let invalid_over_file = ConfigManager::load_from_file(&config_path);
    clear_env();

    let config = from_env?;
    assert_eq!(config.server.bind_addr, "127.0.0.1:5050".parse()?);
    assert_eq!(config.relay.malformed_policy, MalformedPolicy::Close);
    assert_eq!(config.server.shutdown_timeout, Duration::from_secs(2));

    let config = from_file?;
    assert_eq!(config.server.bind_addr, "0.0.0.0:9999".parse()?);
    assert_eq!(config.server.max_connections, 32);

    assert_eq!(from_cli?.server.bind_addr.port(), 7000);

    assert_err!(invalid_env);
    assert_err!(invalid_over_file);
    Ok(())
}
