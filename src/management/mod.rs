//! Management API Module
//!
//! Health, session status and Prometheus routes served beside the
//! signaling endpoint.

pub mod api;
pub mod handlers;
pub mod types;

pub use api::ManagementApi;
pub use handlers::AppState;
pub use types::*;
