//! Connection Management Module
//!
//! HTTP listener, WebSocket upgrade and per-connection lifecycle.

pub mod manager;
pub mod socket;

pub use manager::ConnectionManager;
pub use socket::{ws_handler, ConnectionSlot};
