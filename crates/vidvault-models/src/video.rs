//! Video record and lifecycle state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::VideoId;

/// Video lifecycle status.
///
/// The status moves forward along
/// `PENDING_UPLOAD → UPLOADING → PROCESSING → {READY | FAILED}`.
/// `READY` is terminal. `FAILED` can re-enter `PROCESSING` when the
/// queue redelivers the job; nothing else leaves it (cleanup deletion
/// happens in the API layer, by record removal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    /// Record created, upload not yet started
    #[default]
    PendingUpload,
    /// Client is uploading to the object store
    Uploading,
    /// Upload confirmed, background processing in flight
    Processing,
    /// Thumbnail extracted, video available
    Ready,
    /// Processing failed
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::PendingUpload => "PENDING_UPLOAD",
            VideoStatus::Uploading => "UPLOADING",
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::Ready => "READY",
            VideoStatus::Failed => "FAILED",
        }
    }

    /// Check if no further automatic transition occurs from this state.
    /// A queue-driven retry may still move `FAILED` back to `PROCESSING`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }

    /// Whether a transition to `next` is allowed.
    ///
    /// Only forward steps along the lifecycle are valid, plus
    /// `FAILED → PROCESSING` for a redelivered job retrying after a
    /// failed attempt. A same-status write is allowed as an idempotent
    /// no-op, so a best-effort FAILED write after the queue gives up
    /// does not error if the pipeline already recorded the failure.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            VideoStatus::PendingUpload => matches!(next, VideoStatus::Uploading),
            VideoStatus::Uploading => matches!(next, VideoStatus::Processing),
            VideoStatus::Processing => matches!(next, VideoStatus::Ready | VideoStatus::Failed),
            VideoStatus::Failed => matches!(next, VideoStatus::Processing),
            VideoStatus::Ready => false,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid video status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: VideoStatus,
    pub to: VideoStatus,
}

/// Video record as stored in the `videos` collection.
///
/// The processing core does not own creation; the API layer inserts the
/// record when an upload is initiated. The core reads it for ownership
/// checks and writes the `status` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,
    /// Owning user
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Original filename
    pub filename: String,
    /// Object store key of the source video
    pub storage_key: String,
    /// Size in bytes
    pub size: u64,
    /// Duration in seconds, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Lifecycle status
    #[serde(default)]
    pub status: VideoStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new video record in the initial lifecycle state.
    pub fn new(
        id: VideoId,
        user_id: impl Into<String>,
        title: impl Into<String>,
        filename: impl Into<String>,
        storage_key: impl Into<String>,
        size: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: user_id.into(),
            title: title.into(),
            filename: filename.into(),
            storage_key: storage_key.into(),
            size,
            duration: None,
            status: VideoStatus::PendingUpload,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate and apply a status transition.
    pub fn transition(&mut self, next: VideoStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&VideoStatus::PendingUpload).unwrap();
        assert_eq!(json, "\"PENDING_UPLOAD\"");
        let back: VideoStatus = serde_json::from_str("\"READY\"").unwrap();
        assert_eq!(back, VideoStatus::Ready);
    }

    #[test]
    fn test_forward_transitions_allowed() {
        use VideoStatus::*;
        assert!(PendingUpload.can_transition_to(Uploading));
        assert!(Uploading.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Ready));
        assert!(Processing.can_transition_to(Failed));
    }

    #[test]
    fn test_backward_and_skipping_transitions_rejected() {
        use VideoStatus::*;
        assert!(!Uploading.can_transition_to(PendingUpload));
        assert!(!Processing.can_transition_to(Uploading));
        assert!(!PendingUpload.can_transition_to(Processing));
        assert!(!PendingUpload.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Failed));
        assert!(!Ready.can_transition_to(Processing));
    }

    #[test]
    fn test_failed_allows_retry_into_processing() {
        use VideoStatus::*;
        assert!(Failed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Ready));
        assert!(!Failed.can_transition_to(Uploading));
    }

    #[test]
    fn test_same_status_is_idempotent() {
        use VideoStatus::*;
        assert!(Failed.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Processing));
    }

    #[test]
    fn test_record_transition_updates_timestamp() {
        let mut record = VideoRecord::new(
            VideoId::from("v1"),
            "u1",
            "clip",
            "clip.mp4",
            "videos/u1/v1/clip.mp4",
            1024,
        );
        let before = record.updated_at;
        record.transition(VideoStatus::Uploading).unwrap();
        assert_eq!(record.status, VideoStatus::Uploading);
        assert!(record.updated_at >= before);

        let err = record.transition(VideoStatus::Ready).unwrap_err();
        assert_eq!(err.from, VideoStatus::Uploading);
        assert_eq!(err.to, VideoStatus::Ready);
    }
}
