//! HTTP middleware

use axum::{
    extract::Request,
    http::{Method, Uri, header},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

/// How a request left the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Failed,
    /// Headers of a live audio body went out; the session logs its own end
    StreamStarted,
    Completed,
}

fn outcome(response: &Response) -> Outcome {
    if response.status().as_u16() >= 400 {
        return Outcome::Failed;
    }
    let is_audio = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("audio/"));
    if is_audio {
        Outcome::StreamStarted
    } else {
        Outcome::Completed
    }
}

/// Request logging middleware
///
/// Audio responses are logged as started; `event=completed|failed` from the
/// relay session marks when they actually end.
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    info!(method = %method, uri = %uri, request_id = %request_id, "HTTP request started");

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis();

    match outcome(&response) {
        Outcome::Failed => warn!(
            method = %method,
            uri = %uri,
            status,
            request_id = %request_id,
            duration_ms = elapsed_ms,
            "HTTP request failed"
        ),
        Outcome::StreamStarted => info!(
            method = %method,
            uri = %uri,
            status,
            request_id = %request_id,
            startup_ms = elapsed_ms,
            "Audio stream started"
        ),
        Outcome::Completed => info!(
            method = %method,
            uri = %uri,
            status,
            request_id = %request_id,
            duration_ms = elapsed_ms,
            "HTTP request completed"
        ),
    }

    response
}
