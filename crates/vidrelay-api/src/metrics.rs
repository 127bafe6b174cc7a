//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vidrelay_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vidrelay_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vidrelay_http_requests_in_flight";

    // Upload intake
    pub const UPLOADS_ACCEPTED_TOTAL: &str = "vidrelay_uploads_accepted_total";
    pub const UPLOADS_REJECTED_TOTAL: &str = "vidrelay_uploads_rejected_total";
    pub const UPLOAD_BYTES: &str = "vidrelay_upload_bytes";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vidrelay_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an upload that was stored and handed to the pipeline.
pub fn record_upload_accepted(size_bytes: u64) {
    counter!(names::UPLOADS_ACCEPTED_TOTAL).increment(1);
    histogram!(names::UPLOAD_BYTES).record(size_bytes as f64);
}

/// Record an upload rejected at intake.
pub fn record_upload_rejected(reason: &'static str) {
    counter!(names::UPLOADS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint).to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse unknown paths so scanners can't blow up label cardinality.
fn sanitize_path(path: &str) -> &str {
    match path {
        "/upload" | "/upload/output" | "/upload/summary" | "/health" | "/healthz" | "/ready"
        | "/metrics" => path,
        _ => "other",
    }
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
