//! Background job worker for VidVault.
//!
//! This crate provides:
//! - The thumbnail extraction pipeline (download, extract, upload,
//!   index, mark ready)
//! - Topic handlers for video processing and email notification jobs
//! - A per-topic executor with bounded concurrency, stall reclaim, and
//!   heartbeats for in-flight jobs

pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use handlers::WorkerContext;
pub use pipeline::ThumbnailPipeline;
