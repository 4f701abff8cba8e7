//! Centralized error handling for the audio relay
//!
//! # Error Categories
//!
//! - **Process Errors**: spawning, timing out, or reading external tools
//! - **Resolve/Search Errors**: candidate fallback exhausted or bad input
//! - **Relay Errors**: transcoder lifecycle failures
//! - **Validation/Capacity Errors**: request rejected before any work starts

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for relay Results
pub type RelayResult<T> = Result<T, RelayError>;
