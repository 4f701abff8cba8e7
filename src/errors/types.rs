//! Error type definitions for the audio relay
//!
//! Each layer owns an error enum; `AppError` aggregates them so handlers can
//! use `?` and hand the result to `web::responses::handle_error`.

use std::time::Duration;
use thiserror::Error;

use crate::streaming::classification::FatalKind;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Source resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Search and related-list errors
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Transcode relay errors
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Concurrency limit reached; new work is rejected
    #[error("Capacity exceeded: {resource} limit of {limit} reached")]
    Capacity { resource: String, limit: usize },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors from running an external process
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Executable missing, not executable, or otherwise unspawnable
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exceeded its time budget and was killed
    #[error("'{command}' timed out after {}", human_duration(.timeout))]
    Timeout { command: String, timeout: Duration },

    /// Reading the process pipes or waiting for exit failed
    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// True when the executable could not be found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProcessError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Why a single candidate attempt did not produce a usable result
#[derive(Error, Debug)]
pub enum CandidateError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("exited with status {}: {stderr}", exit_label(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("produced no output")]
    EmptyOutput,

    #[error("unparseable output: {message}")]
    Parse { message: String },

    #[error("invalid resolution '{url}': {reason}")]
    InvalidResolution { url: String, reason: String },

    #[error("returned no results")]
    NoResults,
}

/// One failed attempt, attributed to the candidate that made it
#[derive(Error, Debug)]
#[error("{candidate}: {error}")]
pub struct CandidateFailure {
    pub candidate: String,
    #[source]
    pub error: CandidateError,
}

fn human_duration(duration: &Duration) -> String {
    humantime::format_duration(*duration).to_string()
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Summarise attempts as `name: reason; name: reason`
pub fn describe_attempts(attempts: &[CandidateFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// True when every attempt failed because its executable was missing
pub fn all_tools_missing(attempts: &[CandidateFailure]) -> bool {
    !attempts.is_empty()
        && attempts.iter().all(|a| match &a.error {
            CandidateError::Process(e) => e.is_not_found(),
            _ => false,
        })
}

/// Single-media resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid media identifier: {0}")]
    InvalidInput(String),

    /// Every candidate was tried once and none produced valid media
    #[error("All {} resolver candidates failed: {}", .attempts.len(), describe_attempts(.attempts))]
    Exhausted { attempts: Vec<CandidateFailure> },
}

/// Search and related-list errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("All {} search candidates failed: {}", .attempts.len(), describe_attempts(.attempts))]
    Exhausted { attempts: Vec<CandidateFailure> },
}

/// Transcode relay session failures
#[derive(Error, Debug)]
pub enum RelayError {
    /// Transcoder could not be started
    #[error("Failed to start transcoder '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// No output arrived within the startup window
    #[error("No audio data received within {}", human_duration(.timeout))]
    StartupTimeout { timeout: Duration },

    /// Transcoder reported that its input could not be read
    #[error("Source unavailable ({kind}): {line}")]
    SourceUnavailable { kind: FatalKind, line: String },

    /// Transcoder exited before producing any output
    #[error("Transcoder exited with status {} before producing audio: {stderr}", exit_label(.code))]
    TranscodeFailed { code: Option<i32>, stderr: String },

    /// Transcoder failed after audio had already been sent
    #[error("Transcoder exited with status {} mid-stream: {stderr}", exit_label(.code))]
    TranscoderExited { code: Option<i32>, stderr: String },

    #[error("Transcoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}
