//! Capability-checked handle over the job queue.
//!
//! The rest of the app talks to the queue through [`JobService`]. When
//! Redis is unreachable at startup the handle is still constructed, but
//! every operation fails uniformly with
//! [`QueueError::ServiceUnavailable`] so uploads are rejected rather
//! than silently dropped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use vidvault_models::{JobCounts, JobId, JobRecord, VideoId};

use crate::error::{QueueError, QueueResult};
use crate::job::{ProcessVideoJob, QueueJob, SendEmailJob, Topic};
use crate::queue::{JobQueue, QueueConfig};

/// How many recent jobs the status endpoint reports per topic.
const STATUS_RECENT_LIMIT: usize = 10;

/// Snapshot of one topic for the debug endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub topic: Topic,
    pub counts: JobCounts,
    pub recent: Vec<JobRecord>,
}

/// Shared handle used by producers to enqueue jobs.
#[derive(Clone)]
pub struct JobService {
    queue: Option<Arc<JobQueue>>,
}

impl JobService {
    /// Connect to Redis and prepare the consumer groups. On any
    /// failure this returns an unavailable handle instead of an error.
    pub async fn connect(config: QueueConfig) -> Self {
        let queue = match JobQueue::new(config) {
            Ok(queue) => queue,
            Err(e) => {
                error!("Job queue client could not be created: {}", e);
                return Self { queue: None };
            }
        };

        match queue.init().await {
            Ok(()) => {
                info!("Job queue connected");
                Self {
                    queue: Some(Arc::new(queue)),
                }
            }
            Err(e) => {
                error!("Job queue unreachable, enqueues will be rejected: {}", e);
                Self { queue: None }
            }
        }
    }

    /// Construct an always-unavailable handle.
    pub fn unavailable() -> Self {
        Self { queue: None }
    }

    /// Whether the underlying queue connected at startup.
    pub fn is_ready(&self) -> bool {
        self.queue.is_some()
    }

    fn queue(&self) -> QueueResult<&Arc<JobQueue>> {
        self.queue.as_ref().ok_or(QueueError::ServiceUnavailable)
    }

    /// Enqueue thumbnail extraction for an uploaded video.
    pub async fn enqueue_video_processing(
        &self,
        video_id: VideoId,
        storage_key: impl Into<String>,
        user_id: impl Into<String>,
    ) -> QueueResult<JobId> {
        let queue = self.queue()?;
        let job = ProcessVideoJob::new(video_id, storage_key, user_id);
        let job_id = job.job_id.clone();
        queue.enqueue(QueueJob::ProcessVideo(job)).await?;
        Ok(job_id)
    }

    /// Enqueue a notification email.
    pub async fn enqueue_email(
        &self,
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> QueueResult<JobId> {
        let queue = self.queue()?;
        let job = SendEmailJob::new(to, subject, html_body);
        let job_id = job.job_id.clone();
        queue.enqueue(QueueJob::SendEmail(job)).await?;
        Ok(job_id)
    }

    /// Counts and recent history for one topic.
    pub async fn queue_status(&self, topic: Topic) -> QueueResult<QueueStatus> {
        let queue = self.queue()?;
        let counts = queue.counts(topic).await?;
        let recent = queue.recent(topic, STATUS_RECENT_LIMIT).await?;
        Ok(QueueStatus {
            topic,
            counts,
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_handle_rejects_every_operation() {
        let service = JobService::unavailable();
        assert!(!service.is_ready());

        let enqueue = service
            .enqueue_video_processing(VideoId::from("v1"), "uploads/u1/v1.mp4", "u1")
            .await;
        assert!(matches!(enqueue, Err(QueueError::ServiceUnavailable)));

        let email = service
            .enqueue_email("user@example.com", "Ready", "<p>done</p>")
            .await;
        assert!(matches!(email, Err(QueueError::ServiceUnavailable)));

        let status = service.queue_status(Topic::VideoProcessing).await;
        assert!(matches!(status, Err(QueueError::ServiceUnavailable)));
    }

    #[tokio::test]
    async fn test_connect_with_bad_url_yields_unavailable_handle() {
        let config = QueueConfig {
            redis_url: "not-a-redis-url".to_string(),
            ..QueueConfig::default()
        };
        let service = JobService::connect(config).await;
        assert!(!service.is_ready());
    }
}
