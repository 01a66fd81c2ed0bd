//! Job queue using Redis Streams.
//!
//! Each topic is a separate stream consumed through a shared consumer
//! group. Delivery is at-least-once: unacked entries stay pending and
//! are reclaimed after the visibility timeout. Attempt counts live in
//! keyed counters with a TTL, and finished jobs are pushed onto a
//! bounded per-topic history list.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};
use vidvault_models::{JobCounts, JobRecord};

use crate::error::{QueueError, QueueResult};
use crate::job::{QueueJob, Topic};

/// How many finished jobs each topic keeps in its history list.
pub const HISTORY_LIMIT: usize = 50;

/// TTL for per-message attempt counters.
const ATTEMPTS_TTL_SECS: i64 = 86400;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Key prefix for streams, counters, and history
    pub key_prefix: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Retries granted after the first failed attempt
    pub max_stall_retries: u32,
    /// Idle time before a pending job is considered stalled
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "vidvault".to_string(),
            consumer_group: "vidvault:workers".to_string(),
            max_stall_retries: 3,
            visibility_timeout: Duration::from_secs(300),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("QUEUE_KEY_PREFIX")
                .unwrap_or_else(|_| "vidvault".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "vidvault:workers".to_string()),
            max_stall_retries: std::env::var("QUEUE_MAX_STALL_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }

    /// Stream key for a topic.
    pub fn stream_key(&self, topic: Topic) -> String {
        format!("{}:jobs:{}", self.key_prefix, topic)
    }

    fn attempts_key(&self, message_id: &str) -> String {
        format!("{}:attempts:{}", self.key_prefix, message_id)
    }

    fn counter_key(&self, topic: Topic, outcome: &str) -> String {
        format!("{}:count:{}:{}", self.key_prefix, topic, outcome)
    }

    fn history_key(&self, topic: Topic) -> String {
        format!("{}:history:{}", self.key_prefix, topic)
    }
}

/// A job handed to a worker, paired with its stream message ID.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry ID, used for ack and attempt tracking
    pub message_id: String,
    /// The decoded job
    pub job: QueueJob,
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer groups if not exist).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        for topic in Topic::ALL {
            let stream = self.config.stream_key(topic);
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(&stream)
                .arg(&self.config.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;

            match result {
                Ok(_) => info!("Created consumer group on {}", stream),
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!("Consumer group already exists on {}", stream);
                }
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }

        Ok(())
    }

    /// Enqueue a job on its topic stream.
    pub async fn enqueue(&self, job: QueueJob) -> QueueResult<String> {
        job.validate()?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(&job)?;
        let stream = self.config.stream_key(job.topic());

        let message_id: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            "Enqueued job {} on {} with message ID {}",
            job.job_id(),
            job.topic(),
            message_id
        );

        Ok(message_id)
    }

    /// Consume new jobs from a topic.
    pub async fn consume(
        &self,
        topic: Topic,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.config.stream_key(topic);

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&stream)
            .arg(">") // Only new messages
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                if let Some(delivery) = self.decode_entry(topic, entry.id, &entry.map).await {
                    deliveries.push(delivery);
                }
            }
        }

        Ok(deliveries)
    }

    /// Claim pending jobs that have been idle past the visibility
    /// timeout. This covers both crashed workers and failed attempts
    /// left pending for redelivery.
    ///
    /// Uses XAUTOCLAIM, which scans the pending entries list and
    /// claims idle entries in one call. The scan restarts from `0-0`
    /// each time; with a bounded COUNT the oldest stalled entries are
    /// picked up first and the rest on later ticks.
    pub async fn claim_stalled(
        &self,
        topic: Topic,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamAutoClaimReply = self
            .autoclaim_cmd(topic, consumer_name, min_idle_ms, count)
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for entry in result.claimed {
            if let Some(delivery) = self.decode_entry(topic, entry.id, &entry.map).await {
                info!("Claimed stalled job {}", delivery.job.job_id());
                deliveries.push(delivery);
            }
        }

        Ok(deliveries)
    }

    fn autoclaim_cmd(
        &self,
        topic: Topic,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> redis::Cmd {
        let mut cmd = redis::cmd("XAUTOCLAIM");
        cmd.arg(self.config.stream_key(topic))
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(count);
        cmd
    }

    /// Decode a stream entry into a delivery. Malformed payloads are
    /// acked away so they cannot wedge the consumer group.
    async fn decode_entry(
        &self,
        topic: Topic,
        message_id: String,
        map: &std::collections::HashMap<String, redis::Value>,
    ) -> Option<Delivery> {
        let Some(redis::Value::BulkString(payload)) = map.get("job") else {
            warn!("Stream entry {} has no job field, discarding", message_id);
            self.discard(topic, &message_id).await.ok();
            return None;
        };

        let payload_str = String::from_utf8_lossy(payload);
        match serde_json::from_str::<QueueJob>(&payload_str) {
            Ok(job) => {
                debug!("Consumed job {} from {}", job.job_id(), topic);
                Some(Delivery { message_id, job })
            }
            Err(e) => {
                warn!("Failed to parse job payload: {}, discarding", e);
                self.discard(topic, &message_id).await.ok();
                None
            }
        }
    }

    /// Refresh ownership of an in-flight job so it is not treated as
    /// stalled while the handler is still running.
    pub async fn heartbeat(
        &self,
        topic: Topic,
        consumer_name: &str,
        message_id: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // XCLAIM with min-idle-time 0 resets the idle clock. JUSTID
        // avoids redelivering the payload or bumping the counter.
        let _claimed: Vec<String> = redis::cmd("XCLAIM")
            .arg(self.config.stream_key(topic))
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        debug!("Heartbeat for message {}", message_id);
        Ok(())
    }

    /// Acknowledge a successful job and record its outcome.
    pub async fn ack(&self, topic: Topic, message_id: &str, record: &JobRecord) -> QueueResult<()> {
        self.finish(topic, message_id).await?;
        self.record_outcome(topic, "completed", record).await?;
        debug!("Acknowledged job {} ({})", record.job_id, message_id);
        Ok(())
    }

    /// Retire a job that will not run again and record the failure.
    pub async fn mark_failed(
        &self,
        topic: Topic,
        message_id: &str,
        record: &JobRecord,
    ) -> QueueResult<()> {
        self.finish(topic, message_id).await?;
        self.record_outcome(topic, "failed", record).await?;
        warn!(
            "Retired failed job {} ({}): {}",
            record.job_id,
            message_id,
            record.failure_reason.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }

    /// Remove an entry from the group and the stream without recording
    /// an outcome. Used for unparseable entries.
    async fn discard(&self, topic: Topic, message_id: &str) -> QueueResult<()> {
        self.finish(topic, message_id).await
    }

    async fn finish(&self, topic: Topic, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.config.stream_key(topic);

        redis::cmd("XACK")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&stream)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        let _: () = conn.del(self.config.attempts_key(message_id)).await?;
        Ok(())
    }

    async fn record_outcome(
        &self,
        topic: Topic,
        outcome: &str,
        record: &JobRecord,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _: u64 = conn.incr(self.config.counter_key(topic, outcome), 1).await?;

        let entry = serde_json::to_string(record)?;
        let history = self.config.history_key(topic);
        let _: () = conn.lpush(&history, entry).await?;
        let _: () = conn.ltrim(&history, 0, (HISTORY_LIMIT as isize) - 1).await?;

        Ok(())
    }

    /// Count a failed execution attempt for a message.
    pub async fn increment_attempts(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = self.config.attempts_key(message_id);
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, ATTEMPTS_TTL_SECS).await?;
        Ok(count)
    }

    /// Whether a message that has failed `attempts` times has used up
    /// its initial attempt plus all stall retries.
    pub fn retries_exhausted(&self, attempts: u32) -> bool {
        attempts >= 1 + self.config.max_stall_retries
    }

    /// Idle threshold for stall reclaim, in milliseconds.
    pub fn visibility_timeout_ms(&self) -> u64 {
        self.config.visibility_timeout.as_millis() as u64
    }

    /// Per-topic job counts.
    ///
    /// Waiting and active are derived from stream length and the
    /// pending entries list; completed and failed come from the
    /// outcome counters.
    pub async fn counts(&self, topic: Topic) -> QueueResult<JobCounts> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.config.stream_key(topic);

        let len: u64 = conn.xlen(&stream).await?;

        let pending: redis::streams::StreamPendingReply = redis::cmd("XPENDING")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await?;
        let active = pending.count() as u64;

        let completed: Option<u64> = conn.get(self.config.counter_key(topic, "completed")).await?;
        let failed: Option<u64> = conn.get(self.config.counter_key(topic, "failed")).await?;

        Ok(JobCounts {
            waiting: len.saturating_sub(active),
            active,
            completed: completed.unwrap_or(0),
            failed: failed.unwrap_or(0),
        })
    }

    /// Most recent finished jobs on a topic, newest first.
    pub async fn recent(&self, topic: Topic, limit: usize) -> QueueResult<Vec<JobRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let limit = limit.min(HISTORY_LIMIT);
        let entries: Vec<String> = conn
            .lrange(self.config.history_key(topic), 0, (limit as isize) - 1)
            .await?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_str::<JobRecord>(&entry) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable history entry: {}", e),
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_key_layout() {
        let config = QueueConfig::default();
        assert_eq!(
            config.stream_key(Topic::VideoProcessing),
            "vidvault:jobs:video-processing"
        );
        assert_eq!(
            config.stream_key(Topic::EmailNotifications),
            "vidvault:jobs:email-notifications"
        );
        assert_eq!(
            config.history_key(Topic::VideoProcessing),
            "vidvault:history:video-processing"
        );
        assert_eq!(
            config.counter_key(Topic::EmailNotifications, "failed"),
            "vidvault:count:email-notifications:failed"
        );
    }

    #[test]
    fn test_retries_exhausted_after_initial_attempt_plus_retries() {
        let queue = JobQueue::new(QueueConfig::default()).unwrap();

        // Initial attempt plus three stall retries.
        assert!(!queue.retries_exhausted(1));
        assert!(!queue.retries_exhausted(2));
        assert!(!queue.retries_exhausted(3));
        assert!(queue.retries_exhausted(4));
        assert!(queue.retries_exhausted(5));
    }

    #[test]
    fn test_stall_reclaim_is_an_autoclaim_scan() {
        let queue = JobQueue::new(QueueConfig::default()).unwrap();
        let cmd = queue.autoclaim_cmd(Topic::VideoProcessing, "worker-1", 300_000, 5);
        let packed = String::from_utf8_lossy(&cmd.get_packed_command()).into_owned();

        // XCLAIM only claims explicitly listed IDs, so a stall sweep
        // has to go through XAUTOCLAIM's cursor scan.
        assert!(packed.contains("XAUTOCLAIM"));
        assert!(packed.contains("vidvault:jobs:video-processing"));
        assert!(packed.contains("vidvault:workers"));
        assert!(packed.contains("300000"));
        assert!(packed.contains("0-0"));
        assert!(packed.contains("COUNT"));
        assert!(!packed.contains("XCLAIM\r\n"));
    }

    #[test]
    fn test_invalid_redis_url_is_rejected() {
        let config = QueueConfig {
            redis_url: "not-a-redis-url".to_string(),
            ..QueueConfig::default()
        };
        assert!(JobQueue::new(config).is_err());
    }
}
