//! # Request Metrics
//!
//! Records request counts and latencies through the `metrics` facade. The
//! server binary installs a Prometheus recorder and serves it at
//! `/metrics`; without a recorder the macros are no-ops.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

pub const REQUESTS_TOTAL: &str = "deck_http_requests_total";
pub const REQUEST_DURATION: &str = "deck_http_request_duration_seconds";
pub const ERRORS_TOTAL: &str = "deck_http_errors_total";
pub const SECTION_RENDERS_TOTAL: &str = "deck_section_renders_total";

/// Middleware that counts requests and observes their latency, labelled by
/// method, matched route and status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;

    let status = response.status();
    let code = status.as_u16().to_string();
    metrics::histogram!(REQUEST_DURATION, "method" => method.clone(), "route" => route.clone())
        .record(start.elapsed().as_secs_f64());
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(ERRORS_TOTAL, "route" => route.clone(), "status" => code.clone())
            .increment(1);
    }
    metrics::counter!(REQUESTS_TOTAL, "method" => method, "route" => route, "status" => code)
        .increment(1);

    response
}
