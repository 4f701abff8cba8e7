//! HTTP request handlers organized by domain

pub mod health;
pub mod search;
pub mod stream;

use crate::errors::AppError;

/// Extract a required, non-blank query parameter
pub(crate) fn require_param(value: Option<String>, name: &str) -> Result<String, AppError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AppError::Validation {
            message: format!("Missing required parameter: {name}"),
        }),
    }
}
