//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
///
/// Video processing always runs with a single slot so jobs finish in
/// enqueue order; only email delivery concurrency is tunable.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Concurrent email delivery jobs
    pub email_concurrency: usize,
    /// How often the worker scans for stalled pending jobs
    pub claim_interval: Duration,
    /// Interval for refreshing job ownership while a handler runs
    pub job_heartbeat_interval: Duration,
    /// Kill the frame extractor after this long
    pub extractor_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            email_concurrency: 4,
            claim_interval: Duration::from_secs(30),
            job_heartbeat_interval: Duration::from_secs(30),
            extractor_timeout: Duration::from_secs(120),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            email_concurrency: std::env::var("WORKER_EMAIL_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            job_heartbeat_interval: Duration::from_secs(
                std::env::var("WORKER_JOB_HEARTBEAT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            extractor_timeout: Duration::from_secs(
                std::env::var("WORKER_EXTRACTOR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
