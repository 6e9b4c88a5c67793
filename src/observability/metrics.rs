//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): gate decisions by outcome and
//!   matched entry; rejected requests carry the entry label `none`
//! - `gate_refresh_total` (counter): background refresh passes by result
//!
//! # Design Decisions
//! - Counters only; decision latency is dominated by the upstream and
//!   belongs to its own telemetry
//! - The exporter is optional and failure to start it never takes the
//!   gate down

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter started"),
        Err(err) => tracing::error!(error = %err, "failed to start metrics exporter"),
    }
}

/// Count one gate decision.
pub fn record_decision(outcome: &'static str, proxy: &str) {
    counter!(
        "gate_requests_total",
        "outcome" => outcome,
        "proxy" => proxy.to_string()
    )
    .increment(1);
}

/// Count one background refresh pass.
pub fn record_refresh(result: &'static str) {
    counter!("gate_refresh_total", "result" => result).increment(1);
}
