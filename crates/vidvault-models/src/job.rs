//! Job state and the bounded observability history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Enqueued, not yet picked up by a worker
    #[default]
    Waiting,
    /// Owned by exactly one worker, execution in flight
    Active,
    /// Finished successfully
    Completed,
    /// Finished with a failure that will not be redelivered
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a finished job, retained in a bounded per-topic history.
///
/// Jobs are owned by exactly one worker between dequeue and ack/nack, so
/// the record is written once when the outcome is reported and never
/// mutated concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job ID
    pub job_id: JobId,
    /// Topic the job ran on
    pub topic: String,
    /// Job payload (opaque JSON)
    pub payload: serde_json::Value,
    /// Total delivery attempts
    pub attempts: u32,
    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Final state (`completed` or `failed`)
    pub state: JobState,
    /// Result summary for completed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Failure reason for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// When the outcome was recorded
    pub finished_at: DateTime<Utc>,
}

impl JobRecord {
    /// Record a successful outcome.
    pub fn completed(
        job_id: JobId,
        topic: impl Into<String>,
        payload: serde_json::Value,
        attempts: u32,
        enqueued_at: DateTime<Utc>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            topic: topic.into(),
            payload,
            attempts,
            enqueued_at,
            state: JobState::Completed,
            result: Some(result.into()),
            failure_reason: None,
            finished_at: Utc::now(),
        }
    }

    /// Record a permanent failure.
    pub fn failed(
        job_id: JobId,
        topic: impl Into<String>,
        payload: serde_json::Value,
        attempts: u32,
        enqueued_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            topic: topic.into(),
            payload,
            attempts,
            enqueued_at,
            state: JobState::Failed,
            result: None,
            failure_reason: Some(reason.into()),
            finished_at: Utc::now(),
        }
    }
}

/// Per-topic job counts for the debug/observability endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_terminality() {
        assert!(!JobState::Waiting.is_terminal());
        assert!(!JobState::Active.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_failed_record_carries_reason_not_result() {
        let record = JobRecord::failed(
            JobId::new(),
            "video-processing",
            serde_json::json!({"video_id": "v1"}),
            2,
            Utc::now(),
            "extractor exited with code 1",
        );
        assert_eq!(record.state, JobState::Failed);
        assert!(record.result.is_none());
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("extractor exited with code 1")
        );
    }
}
