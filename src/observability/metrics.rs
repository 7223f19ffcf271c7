//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_auth_rejections_total` (counter): rejected tokens by reason
//!
//! Requests that never reach a route are labelled with the error kind
//! (`no_route`, `invalid_path`) instead of a route id. Auth rejections on a
//! matched route carry that route's id.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::error::AuthRejection;

const REQUESTS_TOTAL: &str = "gateway_requests_total";
const REQUEST_DURATION: &str = "gateway_request_duration_seconds";
const AUTH_REJECTIONS: &str = "gateway_auth_rejections_total";

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Total requests handled by the gateway");
    describe_histogram!(REQUEST_DURATION, "End-to-end request latency in seconds");
    describe_counter!(AUTH_REJECTIONS, "Requests rejected by the authenticate filter");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION, "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_rejection(reason: AuthRejection) {
    counter!(AUTH_REJECTIONS, "reason" => reason.as_str()).increment(1);
}
