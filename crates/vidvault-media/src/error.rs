//! Media error types.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running the frame extractor.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Frame extractor not found in PATH")]
    ExtractorNotFound,

    #[error("Frame extractor exited with code {code:?}")]
    ExtractorExited { code: Option<i32> },

    #[error("Frame extractor timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn extractor_exited(code: Option<i32>) -> Self {
        Self::ExtractorExited { code }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
