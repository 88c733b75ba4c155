//! Request observability.
//!
//! # Data Flow
//! ```text
//! dispatcher, response adapter, host
//!     → logging.rs (tracing events inside the per-request `dispatch` span)
//!     → metrics.rs (request counts, latency, send faults)
//!
//! Sinks:
//!     → stdout, human-readable or one JSON object per line
//!     → Prometheus scrape endpoint when enabled
//! ```
//!
//! # Design Decisions
//! - Events carry fields (method, path, request_id, scope) rather than formatted text
//! - Recording a metric without an installed exporter is a no-op

pub mod logging;
pub mod metrics;
