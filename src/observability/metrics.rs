//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_active` (gauge): client sessions currently open
//! - `relay_sessions_total` (counter): client sessions accepted
//! - `relay_round_trips_total` (counter): completed request/response exchanges
//! - `relay_bytes_total` (counter): bytes relayed, by `direction`
//! - `relay_remote_connects_total` (counter): backend connect attempts, by `result`
//! - `relay_remote_timeouts_total` (counter): backend response timeouts
//! - `relay_remote_teardowns_total` (counter): shared connection teardowns
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    metrics::counter!("relay_sessions_total").increment(1);
    metrics::gauge!("relay_sessions_active").increment(1.0);
}

pub fn record_session_closed() {
    metrics::gauge!("relay_sessions_active").decrement(1.0);
}

/// Record one completed round trip.
pub fn record_round_trip(request_bytes: usize, response_bytes: usize) {
    metrics::counter!("relay_round_trips_total").increment(1);
    metrics::counter!("relay_bytes_total", "direction" => "upstream").increment(request_bytes as u64);
    metrics::counter!("relay_bytes_total", "direction" => "downstream").increment(response_bytes as u64);
}

pub fn record_remote_connect(success: bool) {
    let result = if success { "ok" } else { "failed" };
    metrics::counter!("relay_remote_connects_total", "result" => result).increment(1);
}

pub fn record_remote_timeout() {
    metrics::counter!("relay_remote_timeouts_total").increment(1);
}

pub fn record_remote_teardown() {
    metrics::counter!("relay_remote_teardowns_total").increment(1);
}
