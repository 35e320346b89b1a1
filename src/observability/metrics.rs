//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tagon_requests_total` (counter): page requests by route, status
//! - `tagon_request_duration_seconds` (histogram): pipeline latency by route
//! - `tagon_middleware_failures_total` (counter): absorbed failures by middleware, phase
//! - `tagon_guard_denials_total` (counter): denials by route, status
//! - `tagon_routes_registered` (gauge): routes currently registered
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed, so tests never need one

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "tagon_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("tagon_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_middleware_failure(middleware: &str, phase: &'static str) {
    metrics::counter!(
        "tagon_middleware_failures_total",
        "middleware" => middleware.to_string(),
        "phase" => phase
    )
    .increment(1);
}

pub fn record_guard_denial(route: &str, status: u16) {
    metrics::counter!(
        "tagon_guard_denials_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn set_routes_registered(count: usize) {
    metrics::gauge!("tagon_routes_registered").set(count as f64);
}
