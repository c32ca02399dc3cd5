//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (outcomes per connection kind, handler failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `switchyard_dispatch_total` (counter): dispatches by `kind` (http, stream) and
//!   `outcome` (handled, not_found, rejected, redirected, error)
//! - `switchyard_handler_errors_total` (counter): handler failures by `kind`
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels are static strings, never paths, to keep cardinality bounded

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one finished dispatch.
pub fn record_dispatch(kind: &'static str, outcome: &'static str) {
    metrics::counter!("switchyard_dispatch_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

/// Count one handler (or mounted app) failure.
pub fn record_handler_error(kind: &'static str) {
    metrics::counter!("switchyard_handler_errors_total", "kind" => kind).increment(1);
}
