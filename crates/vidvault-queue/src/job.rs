//! Job topics and payload types for the queue.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vidvault_models::{JobId, VideoId};

use crate::error::{QueueError, QueueResult};

/// A named job stream. Each topic is its own Redis stream and is
/// consumed independently, so ordering holds within a topic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    VideoProcessing,
    EmailNotifications,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::VideoProcessing, Topic::EmailNotifications];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::VideoProcessing => "video-processing",
            Topic::EmailNotifications => "email-notifications",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job to extract a thumbnail from an uploaded video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVideoJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video to process
    pub video_id: VideoId,
    /// Object storage key of the uploaded source
    pub storage_key: String,
    /// Owning user
    pub user_id: String,
    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl ProcessVideoJob {
    pub fn new(
        video_id: VideoId,
        storage_key: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            storage_key: storage_key.into(),
            user_id: user_id.into(),
            enqueued_at: Utc::now(),
        }
    }

    /// Reject payloads that a handler could not act on.
    pub fn validate(&self) -> QueueResult<()> {
        if self.video_id.as_str().is_empty() {
            return Err(QueueError::invalid_payload("video_id is empty"));
        }
        if self.storage_key.is_empty() {
            return Err(QueueError::invalid_payload("storage_key is empty"));
        }
        if self.user_id.is_empty() {
            return Err(QueueError::invalid_payload("user_id is empty"));
        }
        Ok(())
    }
}

/// Job to deliver a notification email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl SendEmailJob {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            enqueued_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.to.is_empty() {
            return Err(QueueError::invalid_payload("recipient is empty"));
        }
        if self.subject.is_empty() {
            return Err(QueueError::invalid_payload("subject is empty"));
        }
        if self.html_body.is_empty() {
            return Err(QueueError::invalid_payload("html_body is empty"));
        }
        Ok(())
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    /// Thumbnail extraction for a freshly uploaded video
    ProcessVideo(ProcessVideoJob),
    /// Outbound notification email
    SendEmail(SendEmailJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::ProcessVideo(j) => &j.job_id,
            QueueJob::SendEmail(j) => &j.job_id,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            QueueJob::ProcessVideo(_) => Topic::VideoProcessing,
            QueueJob::SendEmail(_) => Topic::EmailNotifications,
        }
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        match self {
            QueueJob::ProcessVideo(j) => j.enqueued_at,
            QueueJob::SendEmail(j) => j.enqueued_at,
        }
    }

    pub fn validate(&self) -> QueueResult<()> {
        match self {
            QueueJob::ProcessVideo(j) => j.validate(),
            QueueJob::SendEmail(j) => j.validate(),
        }
    }

    /// Opaque payload for job history records.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::VideoProcessing.as_str(), "video-processing");
        assert_eq!(Topic::EmailNotifications.as_str(), "email-notifications");
    }

    #[test]
    fn test_queue_job_serde_roundtrip() {
        let job = ProcessVideoJob::new(VideoId::from("v1"), "uploads/u1/v1.mp4", "u1");
        let wrapper = QueueJob::ProcessVideo(job.clone());

        let json = serde_json::to_string(&wrapper).expect("serialize QueueJob");
        assert!(json.contains("\"type\":\"process_video\""));

        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize QueueJob");
        match decoded {
            QueueJob::ProcessVideo(j) => {
                assert_eq!(j.job_id, job.job_id);
                assert_eq!(j.video_id, job.video_id);
                assert_eq!(j.storage_key, job.storage_key);
                assert_eq!(j.user_id, job.user_id);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_job_topic_routing() {
        let video = QueueJob::ProcessVideo(ProcessVideoJob::new(
            VideoId::from("v1"),
            "uploads/u1/v1.mp4",
            "u1",
        ));
        let email = QueueJob::SendEmail(SendEmailJob::new("a@b.c", "Ready", "<p>done</p>"));

        assert_eq!(video.topic(), Topic::VideoProcessing);
        assert_eq!(email.topic(), Topic::EmailNotifications);
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let job = ProcessVideoJob::new(VideoId::from("v1"), "", "u1");
        assert!(matches!(
            job.validate(),
            Err(QueueError::InvalidPayload(_))
        ));

        let email = SendEmailJob::new("", "Ready", "<p>done</p>");
        assert!(matches!(
            email.validate(),
            Err(QueueError::InvalidPayload(_))
        ));

        let no_subject = SendEmailJob::new("a@b.c", "", "<p>done</p>");
        assert!(matches!(
            no_subject.validate(),
            Err(QueueError::InvalidPayload(_))
        ));

        let no_body = SendEmailJob::new("a@b.c", "Ready", "");
        assert!(matches!(
            no_body.validate(),
            Err(QueueError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_validate_accepts_complete_payloads() {
        let job = ProcessVideoJob::new(VideoId::from("v1"), "uploads/u1/v1.mp4", "u1");
        assert!(job.validate().is_ok());

        let email = SendEmailJob::new("user@example.com", "Ready", "<p>done</p>");
        assert!(email.validate().is_ok());
    }
}
