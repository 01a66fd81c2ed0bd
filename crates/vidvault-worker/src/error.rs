//! Worker error types.
//!
//! The executor decides whether to redeliver a failed job based on
//! [`WorkerError::is_permanent`]: permanent failures retire the job on
//! the first attempt, everything else is retried until the stall retry
//! budget runs out.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Source object missing: {0}")]
    SourceMissing(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vidvault_storage::StorageError),

    #[error("Record store error: {0}")]
    Records(#[from] vidvault_records::RecordError),

    #[error("Media error: {0}")]
    Media(#[from] vidvault_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vidvault_queue::QueueError),

    #[error("Email error: {0}")]
    Email(#[from] vidvault_email::EmailError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn video_not_found(msg: impl Into<String>) -> Self {
        Self::VideoNotFound(msg.into())
    }

    pub fn source_missing(msg: impl Into<String>) -> Self {
        Self::SourceMissing(msg.into())
    }

    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    /// Check if this failure cannot succeed on retry.
    ///
    /// A malformed payload, a video row that does not exist, a source
    /// object that is absent (whether caught by the existence check or
    /// by the download itself), and a lifecycle transition the state
    /// machine forbids all stay broken no matter how often the job is
    /// redelivered.
    pub fn is_permanent(&self) -> bool {
        match self {
            WorkerError::InvalidPayload(_)
            | WorkerError::VideoNotFound(_)
            | WorkerError::SourceMissing(_) => true,
            WorkerError::Storage(e) => e.is_not_found(),
            WorkerError::Records(e) => {
                matches!(e, vidvault_records::RecordError::Transition(_))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidvault_models::{InvalidTransition, VideoStatus};

    #[test]
    fn test_permanent_classification() {
        assert!(WorkerError::invalid_payload("no video_id").is_permanent());
        assert!(WorkerError::video_not_found("v1").is_permanent());
        assert!(WorkerError::source_missing("uploads/u1/v1.mp4").is_permanent());
        // An object deleted between the existence check and the
        // download is just as gone as one never uploaded.
        assert!(WorkerError::Storage(vidvault_storage::StorageError::not_found(
            "uploads/u1/v1.mp4"
        ))
        .is_permanent());
        assert!(WorkerError::Records(vidvault_records::RecordError::Transition(
            InvalidTransition {
                from: VideoStatus::Ready,
                to: VideoStatus::Processing,
            }
        ))
        .is_permanent());
    }

    #[test]
    fn test_transient_classification() {
        assert!(!WorkerError::extraction_failed("no output").is_permanent());
        assert!(!WorkerError::Media(vidvault_media::MediaError::extractor_exited(Some(1)))
            .is_permanent());
        assert!(!WorkerError::Io(std::io::Error::other("pipe")).is_permanent());
        assert!(!WorkerError::Storage(vidvault_storage::StorageError::download_failed(
            "connection reset"
        ))
        .is_permanent());
    }
}
