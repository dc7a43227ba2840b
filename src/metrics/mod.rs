//! Metrics Module
//!
//! Prometheus counters for connections, admissions and relayed traffic.

pub mod collector;

pub use collector::Metrics;
