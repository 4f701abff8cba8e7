//! Streaming HTTP handlers
//!
//! `/stream` resolves a media identifier first; `/radio-stream` relays the
//! supplied URL directly. Both commit a 200 only after the transcoder has
//! produced its first chunk.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use url::Url;

use super::require_param;
use crate::errors::{AppError, AppResult};
use crate::models::{SessionStats, StreamKind};
use crate::web::{AppState, responses::handle_error};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub url: Option<String>,
}

/// GET /stream?url=<media identifier>
pub async fn stream_audio(State(state): State<AppState>, Query(params): Query<StreamParams>) -> Response {
    match start_stream(&state, params.url, StreamKind::Stream).await {
        Ok(response) => response,
        Err(e) => handle_error(e),
    }
}

/// GET /radio-stream?url=<http(s) stream URL>
pub async fn stream_radio(State(state): State<AppState>, Query(params): Query<StreamParams>) -> Response {
    match start_stream(&state, params.url, StreamKind::Radio).await {
        Ok(response) => response,
        Err(e) => handle_error(e),
    }
}

async fn start_stream(state: &AppState, url: Option<String>, kind: StreamKind) -> AppResult<Response> {
    let identifier = require_param(url, "url")?;
    let slot = state.active_streams.reserve()?;

    let source_url = match kind {
        StreamKind::Stream => {
            let _permit = state.active_streams.try_acquire_lookup()?;
            state.resolver.resolve(&identifier).await?.media.url
        }
        StreamKind::Radio => validate_radio_url(&identifier)?,
    };

    let stats = Arc::new(SessionStats::new(kind, source_url.clone()));
    let handle = slot.register(stats);
    let mut session = state.relay.start(&source_url, handle)?;
    let first = session.await_first_chunk().await?;

    info!(
        "session_id={} event=streaming kind={} identifier={}",
        session.id(),
        kind,
        identifier
    );

    let body = Body::from_stream(session.into_body_stream(first));
    stream_response(state.relay.content_type(), body)
}

fn validate_radio_url(raw: &str) -> AppResult<String> {
    let invalid = || AppError::Validation {
        message: format!("url must be an absolute http(s) URL: {raw}"),
    };
    let url = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url.to_string())
}

fn stream_response(content_type: &str, body: Body) -> AppResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::TRANSFER_ENCODING, "chunked")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header(header::ACCEPT_RANGES, "bytes")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|e| AppError::Internal {
            message: format!("failed to build stream response: {e}"),
        })
}
