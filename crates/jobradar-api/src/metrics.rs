//! Prometheus metrics for the search service.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "jobradar_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "jobradar_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "jobradar_http_requests_in_flight";

    // Search metrics
    pub const SEARCHES_TOTAL: &str = "jobradar_searches_total";
    pub const SEARCH_DEGRADED_TOTAL: &str = "jobradar_search_degraded_total";
    pub const DETAILS_FETCHES_TOTAL: &str = "jobradar_details_fetches_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "jobradar_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a multisearch outcome.
pub fn record_search(success: bool) {
    let labels = [("outcome", if success { "ok" } else { "error" }.to_string())];
    counter!(names::SEARCHES_TOTAL, &labels).increment(1);
}

/// Record a search answered with a degradation warning.
pub fn record_search_degraded(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::SEARCH_DEGRADED_TOTAL, &labels).increment(1);
}

/// Record a details fetch.
pub fn record_details_fetch(source: &str, success: bool) {
    let labels = [
        ("source", source.to_string()),
        ("outcome", if success { "ok" } else { "error" }.to_string()),
    ];
    counter!(names::DETAILS_FETCHES_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
