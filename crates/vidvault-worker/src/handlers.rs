//! Topic handlers.

use std::sync::Arc;

use tracing::{info, warn};
use vidvault_email::EmailSender;
use vidvault_queue::{ProcessVideoJob, QueueJob, SendEmailJob};
use vidvault_records::VideoRepository;

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::ThumbnailPipeline;

/// Shared adapters handed to every job handler.
pub struct WorkerContext {
    pub pipeline: ThumbnailPipeline,
    pub email: Arc<dyn EmailSender>,
    pub videos: VideoRepository,
}

impl WorkerContext {
    pub fn new(
        pipeline: ThumbnailPipeline,
        email: Arc<dyn EmailSender>,
        videos: VideoRepository,
    ) -> Self {
        Self {
            pipeline,
            email,
            videos,
        }
    }

    /// Dispatch a job to its handler. Returns a result summary for the
    /// job history.
    pub async fn handle(&self, job: &QueueJob) -> WorkerResult<String> {
        match job {
            QueueJob::ProcessVideo(j) => self.process_video(j).await,
            QueueJob::SendEmail(j) => self.send_email(j).await,
        }
    }

    async fn process_video(&self, job: &ProcessVideoJob) -> WorkerResult<String> {
        let key = self.pipeline.run(job).await?;
        Ok(key)
    }

    /// Deliver a notification email.
    ///
    /// Delivery failures are recorded but do not fail the job; a
    /// notification is not worth burning retries or blocking the topic
    /// over, and the job history still shows what happened.
    async fn send_email(&self, job: &SendEmailJob) -> WorkerResult<String> {
        job.validate()
            .map_err(|e| WorkerError::invalid_payload(e.to_string()))?;

        match self.email.send(&job.to, &job.subject, &job.html_body).await {
            Ok(()) => {
                info!(to = %job.to, "Email delivered");
                Ok(format!("sent to {}", job.to))
            }
            Err(e) => {
                warn!(to = %job.to, "Email delivery completed with errors: {}", e);
                Ok(format!("completed with errors: {}", e))
            }
        }
    }
}
