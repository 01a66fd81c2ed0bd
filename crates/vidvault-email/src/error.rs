//! Email error types.

use thiserror::Error;

/// Result type for email operations.
pub type EmailResult<T> = Result<T, EmailError>;

/// Errors that can occur during email delivery.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Failed to configure email sender: {0}")]
    ConfigError(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Provider rejected message: {0}")]
    Rejected(String),
}

impl EmailError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}
