//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the site metrics
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `nixaweb_requests_total` (counter): page requests by route, status, shape
//! - `nixaweb_request_duration_seconds` (histogram): page handler latency
//! - `nixaweb_hardening_duration_seconds` (histogram): time spent hardening
//! - `nixaweb_hardening_failures_total` (counter): failures by stage
//! - `nixaweb_scripts_obfuscated_total` (counter): inline scripts obfuscated
//! - `nixaweb_rate_limited_total` (counter): requests rejected with 429
//! - `nixaweb_pages_loaded` (gauge): pages in the route table
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Route labels come from the route table, never from the raw path

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a handled page request.
pub fn record_request(route: &str, status: u16, shape: &'static str, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("status", status.to_string()),
        ("shape", shape.to_string()),
    ];
    metrics::counter!("nixaweb_requests_total", &labels).increment(1);
    metrics::histogram!("nixaweb_request_duration_seconds", "shape" => shape)
        .record(start.elapsed().as_secs_f64());
}

/// Record a hardened document.
pub fn record_hardening(elapsed: Duration, scripts: usize) {
    metrics::histogram!("nixaweb_hardening_duration_seconds").record(elapsed.as_secs_f64());
    metrics::counter!("nixaweb_scripts_obfuscated_total").increment(scripts as u64);
}

/// Record a document that could not be hardened.
pub fn record_hardening_failure(stage: &'static str) {
    metrics::counter!("nixaweb_hardening_failures_total", "stage" => stage).increment(1);
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited() {
    metrics::counter!("nixaweb_rate_limited_total").increment(1);
}

/// Record the size of the route table.
pub fn record_pages_loaded(pages: usize) {
    metrics::gauge!("nixaweb_pages_loaded").set(pages as f64);
}
