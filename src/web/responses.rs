//! HTTP response types and utilities
//!
//! Every failure leaves the server as JSON `{error, details?, hint?}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::{AppError, RelayError, ResolveError, SearchError, all_tools_missing, describe_attempts};
use crate::streaming::FatalKind;

const RESOLVER_MISSING_HINT: &str =
    "yt-dlp not found. Install it (pip install yt-dlp) or place the binary at ./bin/yt-dlp";
const RESOLVE_FAILED_HINT: &str =
    "The media may be unavailable, private or region-locked. Updating yt-dlp often helps.";
const TRANSCODER_MISSING_HINT: &str = "FFmpeg not found. Install ffmpeg and make sure it is on PATH.";

/// JSON error body shared by every route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            hint: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Convert an error to the status code and body the client sees
pub fn handle_error(error: AppError) -> Response {
    let (status, body) = error_parts(&error);

    if status.is_server_error() {
        error!("Request failed: status={} error={}", status.as_u16(), error);
    } else {
        warn!("Request rejected: status={} error={}", status.as_u16(), error);
    }

    (status, Json(body)).into_response()
}

fn error_parts(error: &AppError) -> (StatusCode, ErrorBody) {
    match error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, ErrorBody::new(message.clone())),
        AppError::Capacity { resource, limit } => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorBody::new("Server busy")
                .details(format!("{resource} limit of {limit} reached"))
                .hint("Retry in a few seconds"),
        ),
        AppError::Resolve(ResolveError::InvalidInput(message)) => {
            (StatusCode::BAD_REQUEST, ErrorBody::new(message.clone()))
        }
        AppError::Resolve(ResolveError::Exhausted { attempts }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Failed to resolve audio source")
                .details(describe_attempts(attempts))
                .hint(if all_tools_missing(attempts) {
                    RESOLVER_MISSING_HINT
                } else {
                    RESOLVE_FAILED_HINT
                }),
        ),
        AppError::Search(SearchError::InvalidQuery(message)) => {
            (StatusCode::BAD_REQUEST, ErrorBody::new(message.clone()))
        }
        AppError::Search(SearchError::Exhausted { attempts }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Search failed")
                .details(describe_attempts(attempts))
                .hint(if all_tools_missing(attempts) {
                    RESOLVER_MISSING_HINT
                } else {
                    "Try a different query or retry later"
                }),
        ),
        AppError::Relay(relay) => (StatusCode::INTERNAL_SERVER_ERROR, relay_error_body(relay)),
        AppError::Configuration { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Configuration error").details(message.clone()),
        ),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Internal error").details(message.clone()),
        ),
    }
}

fn relay_error_body(error: &RelayError) -> ErrorBody {
    match error {
        RelayError::Spawn { command, source } => {
            let body = ErrorBody::new("Failed to start transcoder").details(format!("{command}: {source}"));
            if source.kind() == std::io::ErrorKind::NotFound {
                body.hint(TRANSCODER_MISSING_HINT)
            } else {
                body.hint("Check that the transcoder command is executable")
            }
        }
        RelayError::StartupTimeout { .. } => ErrorBody::new("Stream startup timed out")
            .details(error.to_string())
            .hint("The source did not deliver audio in time. Try again or pick another source."),
        RelayError::SourceUnavailable { kind, line } => {
            let (message, hint) = match kind {
                FatalKind::NotFound => (
                    "Stream not found",
                    "The stream URL may have expired or moved. Retry to fetch a fresh URL.",
                ),
                FatalKind::Forbidden => (
                    "Access forbidden",
                    "The source refuses to be relayed. Pick different content.",
                ),
                FatalKind::ConnectionRefused => (
                    "Connection refused",
                    "The source is offline or unreachable.",
                ),
                FatalKind::Other => (
                    "Transcoding failed",
                    "The source could not be read by the transcoder.",
                ),
            };
            ErrorBody::new(message).details(line.clone()).hint(hint)
        }
        RelayError::TranscodeFailed { .. } | RelayError::TranscoderExited { .. } => {
            ErrorBody::new("Transcoding failed").details(error.to_string())
        }
        RelayError::Io(e) => ErrorBody::new("Relay I/O error").details(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CandidateError, CandidateFailure, ProcessError};
    use std::time::Duration;

    fn parts(error: AppError) -> (StatusCode, ErrorBody) {
        error_parts(&error)
    }

    #[test]
    fn test_missing_transcoder_hint() {
        let (status, body) = parts(AppError::Relay(RelayError::Spawn {
            command: "ffmpeg".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.hint.as_deref(), Some(TRANSCODER_MISSING_HINT));
    }

    #[test]
    fn test_source_unavailable_variants_differ() {
        let body = |kind| {
            parts(AppError::Relay(RelayError::SourceUnavailable {
                kind,
                line: "Server returned 4xx".to_string(),
            }))
            .1
        };
        let not_found = body(FatalKind::NotFound);
        let forbidden = body(FatalKind::Forbidden);
        let refused = body(FatalKind::ConnectionRefused);

        assert_eq!(not_found.error, "Stream not found");
        assert_eq!(forbidden.error, "Access forbidden");
        assert_eq!(refused.error, "Connection refused");
        assert_ne!(not_found.hint, forbidden.hint);
    }

    #[test]
    fn test_exhausted_with_missing_tools() {
        let attempts = vec![CandidateFailure {
            candidate: "yt-dlp".to_string(),
            error: CandidateError::Process(ProcessError::Spawn {
                command: "yt-dlp".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }];
        let (status, body) = parts(AppError::Resolve(ResolveError::Exhausted { attempts }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.hint.as_deref(), Some(RESOLVER_MISSING_HINT));
        assert!(body.details.unwrap().starts_with("yt-dlp: "));
    }

    #[test]
    fn test_client_errors() {
        let (status, body) = parts(AppError::Validation {
            message: "Missing required parameter: url".to_string(),
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.details.is_none());

        let (status, _) = parts(AppError::Capacity {
            resource: "streams".to_string(),
            limit: 1,
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = parts(AppError::Relay(RelayError::StartupTimeout {
            timeout: Duration::from_secs(15),
        }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.unwrap().contains("15s"));
    }
}
