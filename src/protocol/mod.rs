//! Signaling Protocol
//!
//! Message envelope, roles and close codes shared by the relay and the
//! WebSocket transport.

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::*;
