//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define broadcast metrics (attempts, invocations, side-effect failures)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-method and aggregate outcomes
//!
//! # Metrics
//! - `broadcast_attempts_total` (counter): attempts by method, outcome
//! - `broadcast_attempt_duration_seconds` (histogram): attempt latency by method
//! - `broadcast_invocations_total` (counter): invocations by mode, outcome
//! - `broadcast_side_effect_failures_total` (counter): suppressed hook failures
//! - `ledger_node_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are closed sets (method, outcome, mode, hook); never user data

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// One strategy attempt finished.
pub fn record_attempt(method: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!("broadcast_attempts_total", "method" => method, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("broadcast_attempt_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

/// One orchestrator invocation reached a terminal state.
pub fn record_invocation(mode: &'static str, outcome: &'static str) {
    metrics::counter!("broadcast_invocations_total", "mode" => mode, "outcome" => outcome)
        .increment(1);
}

/// A best-effort side-effect hook failed or timed out.
pub fn record_side_effect_failure(hook: &'static str) {
    metrics::counter!("broadcast_side_effect_failures_total", "hook" => hook).increment(1);
}

/// Result of a ledger node health check.
pub fn record_node_health(healthy: bool) {
    metrics::gauge!("ledger_node_health").set(if healthy { 1.0 } else { 0.0 });
}
