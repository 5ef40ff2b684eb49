//! Logging middleware
//!
//! Records method, path, status and latency for every request. Failures are
//! logged one level above successes so error rates stand out in the logs.

use std::time::Instant;
use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::{info, warn};

pub async fn request_logging(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if is_failure(status) {
        warn!(method = %method, path = %path, status = status.as_u16(), latency_ms, "Request failed");
    } else {
        info!(method = %method, path = %path, status = status.as_u16(), latency_ms, "Request completed");
    }

    response
}

fn is_failure(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
