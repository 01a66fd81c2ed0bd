//! Job executor.
//!
//! One executor runs per topic, each with its own consumer name and
//! concurrency budget. The video topic gets a single slot so videos
//! finish in enqueue order; email runs wider.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vidvault_models::JobRecord;
use vidvault_queue::{Delivery, JobQueue, QueueJob, Topic};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::WorkerContext;

/// Job executor for a single topic.
pub struct JobExecutor {
    topic: Topic,
    concurrency: usize,
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<WorkerContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        topic: Topic,
        concurrency: usize,
        config: WorkerConfig,
        queue: Arc<JobQueue>,
        ctx: Arc<WorkerContext>,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(concurrency));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}-{}", topic, Uuid::new_v4());

        Self {
            topic,
            concurrency,
            config,
            queue,
            ctx,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting executor '{}' on {} with {} slots",
            self.consumer_name, self.topic, self.concurrency
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping {} executor", self.topic);
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming {} jobs: {}", self.topic, e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight {} jobs to complete...", self.topic);
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("{} executor stopped", self.topic);
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Periodically reclaim jobs whose owner stopped heartbeating.
    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.job_semaphore);
        let config = self.config.clone();
        let topic = self.topic;
        let consumer_name = self.consumer_name.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.claim_interval);
            let min_idle_ms = queue.visibility_timeout_ms();

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_stalled(topic, &consumer_name, min_idle_ms, 5).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!("Claimed {} stalled {} jobs", deliveries.len(), topic);
                                for delivery in deliveries {
                                    let Ok(permit) =
                                        Arc::clone(&semaphore).acquire_owned().await
                                    else {
                                        return;
                                    };
                                    let ctx = Arc::clone(&ctx);
                                    let queue = Arc::clone(&queue);
                                    let config = config.clone();
                                    let consumer_name = consumer_name.clone();

                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(
                                            ctx, queue, config, topic, consumer_name, delivery,
                                        )
                                        .await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim stalled {} jobs: {}", topic, e);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Consume and process new jobs from the topic.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let deliveries = self
            .queue
            .consume(
                self.topic,
                &self.consumer_name,
                1000, // Block for 1 second
                available.min(5),
            )
            .await?;

        if deliveries.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from {}", deliveries.len(), self.topic);

        for delivery in deliveries {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&self.queue);
            let config = self.config.clone();
            let consumer_name = self.consumer_name.clone();
            let topic = self.topic;
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::invalid_payload("executor semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, config, topic, consumer_name, delivery).await;
            });
        }

        Ok(())
    }

    /// Execute a single delivery, then report its outcome.
    async fn execute_job(
        ctx: Arc<WorkerContext>,
        queue: Arc<JobQueue>,
        config: WorkerConfig,
        topic: Topic,
        consumer_name: String,
        delivery: Delivery,
    ) {
        let Delivery { message_id, job } = delivery;
        let job_id = job.job_id().clone();
        info!("Executing job {} on {}", job_id, topic);

        // Each delivery counts as one attempt, successful or not.
        let attempts = match queue.increment_attempts(&message_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Could not count attempt for job {}: {}", job_id, e);
                1
            }
        };

        let heartbeat = Self::spawn_heartbeat(
            Arc::clone(&queue),
            topic,
            consumer_name,
            message_id.clone(),
            config.job_heartbeat_interval,
        );

        let result = ctx.handle(&job).await;
        heartbeat.abort();

        match result {
            Ok(summary) => {
                info!("Job {} completed: {}", job_id, summary);
                let record = JobRecord::completed(
                    job_id.clone(),
                    topic.as_str(),
                    job.payload(),
                    attempts,
                    job.enqueued_at(),
                    summary,
                );
                if let Err(e) = queue.ack(topic, &message_id, &record).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
            }
            Err(e) => {
                error!("Job {} failed (attempt {}): {}", job_id, attempts, e);

                let exhausted = queue.retries_exhausted(attempts);
                if e.is_permanent() || exhausted {
                    if exhausted && !e.is_permanent() {
                        warn!("Job {} exhausted its retries, retiring", job_id);
                    }
                    Self::retire_job(&ctx, &queue, topic, &message_id, &job, attempts, &e).await;
                } else {
                    info!(
                        "Job {} left pending for redelivery (attempt {})",
                        job_id, attempts
                    );
                }
            }
        }
    }

    /// Record a terminal failure and flip the affected video to FAILED.
    async fn retire_job(
        ctx: &WorkerContext,
        queue: &JobQueue,
        topic: Topic,
        message_id: &str,
        job: &QueueJob,
        attempts: u32,
        failure: &WorkerError,
    ) {
        let record = JobRecord::failed(
            job.job_id().clone(),
            topic.as_str(),
            job.payload(),
            attempts,
            job.enqueued_at(),
            failure.to_string(),
        );

        if let Err(e) = queue.mark_failed(topic, message_id, &record).await {
            error!("Failed to retire job {}: {}", job.job_id(), e);
        }

        // Surface the terminal failure to the owner. Best effort: the
        // video row may not exist, or may already be terminal.
        if let QueueJob::ProcessVideo(j) = job {
            if let Err(e) = ctx.videos.mark_failed(&j.video_id).await {
                warn!(video_id = %j.video_id, "Could not mark video failed: {}", e);
            }
        }
    }

    /// Keep refreshing ownership so a slow handler is not reclaimed as
    /// stalled mid-run.
    fn spawn_heartbeat(
        queue: Arc<JobQueue>,
        topic: Topic,
        consumer_name: String,
        message_id: String,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick is immediate
            loop {
                ticker.tick().await;
                if let Err(e) = queue.heartbeat(topic, &consumer_name, &message_id).await {
                    warn!("Heartbeat failed for message {}: {}", message_id, e);
                }
            }
        })
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.concurrency {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
