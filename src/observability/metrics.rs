//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define request pipeline metrics (requests, latency, delivery faults)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `pages_requests_total` (counter): requests by method, status, outcome
//! - `pages_request_duration_seconds` (histogram): dispatch latency
//! - `pages_send_faults_total` (counter): failed deliveries by operation
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so unit tests need no setup
//! - Labels are low-cardinality: no paths or request ids

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus exporter on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("outcome", outcome.to_string()),
    ];
    metrics::counter!("pages_requests_total", &labels).increment(1);
    metrics::histogram!("pages_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a failed response delivery.
pub fn record_send_fault(operation: &'static str) {
    metrics::counter!("pages_send_faults_total", "operation" => operation).increment(1);
}
