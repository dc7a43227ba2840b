//! DuoRelay Library
//!
//! One-to-one WebSocket signaling relay. A single broadcaster and a single
//! viewer claim their roles with an `identify` message; everything else they
//! send is forwarded verbatim to the other side.

pub mod config;
pub mod connection;
pub mod management;
pub mod metrics;
pub mod protocol;
pub mod relay;
pub mod shutdown;

pub use config::Config;
pub use connection::ConnectionManager;
pub use relay::{RelayEngine, Session};
pub use shutdown::ShutdownCoordinator;

/// Common error type for the relay server
pub type Result<T> = anyhow::Result<T>;
