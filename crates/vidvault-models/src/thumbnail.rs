//! Thumbnail record and key derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::VideoId;

/// Seek offset into the source video for the extracted frame, in seconds.
pub const THUMBNAIL_OFFSET_SECONDS: u32 = 5;

/// Position index of the thumbnail (single frame in current scope).
pub const THUMBNAIL_POSITION: u32 = 1;

/// Derive the deterministic object store key for a video's thumbnail.
///
/// Keyed by user and video, not by attempt, so a duplicate pipeline run
/// overwrites the same object instead of accumulating copies.
pub fn thumbnail_key(user_id: &str, video_id: &VideoId) -> String {
    format!("thumbnails/{}/{}/thumbnail.jpg", user_id, video_id)
}

/// Thumbnail record as stored in the `thumbnails` collection.
///
/// References the video by ID only (weak reference); video deletion and
/// cascade cleanup belong to the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailRecord {
    /// Unique thumbnail ID
    pub id: String,
    /// Owning video
    pub video_id: VideoId,
    /// Object store key of the image
    pub storage_key: String,
    /// Seek offset the frame was taken at, in seconds
    pub timestamp_offset_seconds: u32,
    /// Position index
    pub position: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ThumbnailRecord {
    /// Create the record for a freshly extracted frame.
    pub fn new(video_id: VideoId, storage_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            video_id,
            storage_key: storage_key.into(),
            timestamp_offset_seconds: THUMBNAIL_OFFSET_SECONDS,
            position: THUMBNAIL_POSITION,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_key_is_deterministic() {
        let video_id = VideoId::from("v1");
        assert_eq!(
            thumbnail_key("u1", &video_id),
            "thumbnails/u1/v1/thumbnail.jpg"
        );
        assert_eq!(
            thumbnail_key("u1", &video_id),
            thumbnail_key("u1", &video_id)
        );
    }

    #[test]
    fn test_record_defaults() {
        let record = ThumbnailRecord::new(VideoId::from("v1"), "thumbnails/u1/v1/thumbnail.jpg");
        assert_eq!(record.timestamp_offset_seconds, 5);
        assert_eq!(record.position, 1);
    }
}
