//! Shared data models for the VidVault backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video and job identifiers
//! - The video lifecycle state machine
//! - Video and thumbnail records
//! - Job state and the bounded job history

pub mod ids;
pub mod job;
pub mod thumbnail;
pub mod video;

// Re-export common types
pub use ids::{JobId, VideoId};
pub use job::{JobCounts, JobRecord, JobState};
pub use thumbnail::{thumbnail_key, ThumbnailRecord, THUMBNAIL_OFFSET_SECONDS, THUMBNAIL_POSITION};
pub use video::{InvalidTransition, VideoRecord, VideoStatus};

/// Record store collection names (original database schema).
pub mod collections {
    pub const VIDEOS: &str = "videos";
    pub const THUMBNAILS: &str = "thumbnails";
    pub const SHARE_LINKS: &str = "share_links";
    pub const OTPS: &str = "otps";
}
