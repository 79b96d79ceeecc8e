//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_forward_requests_total` (counter): forwarding calls by method, status, outcome
//! - `proxy_forward_duration_seconds` (histogram): handler latency by method, outcome
//! - `proxy_auth_rejections_total` (counter): rejected callers by reason
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_forward(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "proxy_forward_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome,
    )
    .increment(1);

    metrics::histogram!(
        "proxy_forward_duration_seconds",
        "method" => method.to_string(),
        "outcome" => outcome,
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_rejection(reason: &'static str) {
    metrics::counter!("proxy_auth_rejections_total", "reason" => reason).increment(1);
}
