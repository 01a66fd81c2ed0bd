//! Record store error types.

use thiserror::Error;
use vidvault_models::InvalidTransition;

/// Result type for record store operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to configure record store: {0}")]
    ConfigError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid lifecycle transition: {0}")]
    Transition(#[from] InvalidTransition),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecordError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
