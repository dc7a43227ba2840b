//! Metrics Collector

use crate::relay::Outcome;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::error;

/// Collects and exports relay metrics
pub struct Metrics {
    prometheus_registry: Registry,

    connections_total: IntCounter,
    active_connections: IntGauge,
    admissions_total: IntCounterVec,
    rejections_total: IntCounterVec,
    messages_relayed_total: IntCounter,
    bytes_relayed_total: IntCounter,
    messages_dropped_total: IntCounterVec,
    cascade_closes_total: IntCounter,
    send_failures_total: IntCounter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let prometheus_registry = Registry::new();

        let connections_total = IntCounter::new(
            "relay_connections_total",
            "Total number of accepted WebSocket connections",
        )
        .expect("Failed to create connections_total counter");

        let active_connections = IntGauge::new(
            "relay_active_connections",
            "Number of currently open WebSocket connections",
        )
        .expect("Failed to create active_connections gauge");

        let admissions_total = IntCounterVec::new(
            Opts::new("relay_admissions_total", "Successful role claims"),
            &["role"],
        )
        .expect("Failed to create admissions_total counter");

        let rejections_total = IntCounterVec::new(
            Opts::new(
                "relay_rejections_total",
                "Connections closed for a protocol violation",
            ),
            &["reason"],
        )
        .expect("Failed to create rejections_total counter");

        let messages_relayed_total = IntCounter::new(
            "relay_messages_relayed_total",
            "Messages forwarded to the counterpart",
        )
        .expect("Failed to create messages_relayed_total counter");

        let bytes_relayed_total = IntCounter::new(
            "relay_bytes_relayed_total",
            "Payload bytes forwarded to the counterpart",
        )
        .expect("Failed to create bytes_relayed_total counter");

        let messages_dropped_total = IntCounterVec::new(
            Opts::new("relay_messages_dropped_total", "Messages not forwarded"),
            &["reason"],
        )
        .expect("Failed to create messages_dropped_total counter");

        let cascade_closes_total = IntCounter::new(
            "relay_cascade_closes_total",
            "Viewers closed because the broadcaster left",
        )
        .expect("Failed to create cascade_closes_total counter");

        let send_failures_total = IntCounter::new(
            "relay_send_failures_total",
            "Outbound frames lost to a full or closed connection queue",
        )
        .expect("Failed to create send_failures_total counter");

        prometheus_registry
            .register(Box::new(connections_total.clone()))
            .expect("Failed to register connections_total");
        prometheus_registry
            .register(Box::new(active_connections.clone()))
            .expect("Failed to register active_connections");
        prometheus_registry
            .register(Box::new(admissions_total.clone()))
            .expect("Failed to register admissions_total");
        prometheus_registry
            .register(Box::new(rejections_total.clone()))
            .expect("Failed to register rejections_total");
        prometheus_registry
            .register(Box::new(messages_relayed_total.clone()))
            .expect("Failed to register messages_relayed_total");
        prometheus_registry
            .register(Box::new(bytes_relayed_total.clone()))
            .expect("Failed to register bytes_relayed_total");
        prometheus_registry
            .register(Box::new(messages_dropped_total.clone()))
            .expect("Failed to register messages_dropped_total");
        prometheus_registry
            .register(Box::new(cascade_closes_total.clone()))
            .expect("Failed to register cascade_closes_total");
        prometheus_registry
            .register(Box::new(send_failures_total.clone()))
            .expect("Failed to register send_failures_total");

        Self {
            prometheus_registry,
            connections_total,
            active_connections,
            admissions_total,
            rejections_total,
            messages_relayed_total,
            bytes_relayed_total,
            messages_dropped_total,
            cascade_closes_total,
            send_failures_total,
        }
    }

    /// A WebSocket connection was opened
    pub fn connection_opened(&self) {
        self.connections_total.inc();
        self.active_connections.inc();
    }

    /// A WebSocket connection task finished
    pub fn connection_closed(&self) {
        self.active_connections.dec();
    }

    /// Record the outcome of one session transition
    pub fn record_outcome(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Admitted(role) => {
                self.admissions_total.with_label_values(&[role.as_str()]).inc();
            }
            Outcome::Rejected(reason) => {
                self.rejections_total
                    .with_label_values(&[reason.as_str()])
                    .inc();
            }
            Outcome::Relayed { bytes, .. } => {
                self.messages_relayed_total.inc();
                self.bytes_relayed_total.inc_by(*bytes as u64);
            }
            Outcome::Dropped(reason) => {
                self.messages_dropped_total
                    .with_label_values(&[reason.as_str()])
                    .inc();
            }
            Outcome::Released { cascaded: true, .. } => {
                self.cascade_closes_total.inc();
            }
            Outcome::Connected | Outcome::Released { .. } | Outcome::Ignored => {}
        }
    }

    /// An outbound frame could not be queued
    pub fn send_failed(&self) {
        self.send_failures_total.inc();
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }

    pub fn get_active_connections(&self) -> i64 {
        self.active_connections.get()
    }

    pub fn get_total_connections(&self) -> u64 {
        self.connections_total.get()
    }

    pub fn get_messages_relayed(&self) -> u64 {
        self.messages_relayed_total.get()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
