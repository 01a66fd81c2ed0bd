//! Redis Streams job queue for VidVault.
//!
//! This crate provides:
//! - Per-topic job streams with consumer-group delivery
//! - At-least-once consumption with stall reclaim via XCLAIM
//! - Bounded per-topic history of finished jobs
//! - A capability-checked [`JobService`] handle that degrades gracefully
//!   when Redis is unreachable

pub mod error;
pub mod job;
pub mod queue;
pub mod service;

pub use error::{QueueError, QueueResult};
pub use job::{ProcessVideoJob, QueueJob, SendEmailJob, Topic};
pub use queue::{Delivery, JobQueue, QueueConfig};
pub use service::{JobService, QueueStatus};
