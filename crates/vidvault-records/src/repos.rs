//! Typed repositories over the record store.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use vidvault_models::{collections, InvalidTransition, ThumbnailRecord, VideoId, VideoRecord, VideoStatus};

use crate::error::{RecordError, RecordResult};
use crate::store::{Filter, RecordStore};

/// Repository for video records.
///
/// The processing core does not create videos; it reads them for key and
/// ownership data and drives the `status` field.
#[derive(Clone)]
pub struct VideoRepository {
    store: Arc<dyn RecordStore>,
}

impl VideoRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &VideoId) -> RecordResult<Option<VideoRecord>> {
        let rows = self
            .store
            .select(collections::VIDEOS, &Filter::new().eq("id", video_id.as_str()))
            .await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Validate and persist a lifecycle transition.
    ///
    /// Reads the current row, checks monotonicity, then updates `status`
    /// and `updated_at`. The read and write are separate calls; the store
    /// gives no transaction, which is acceptable because only one worker
    /// owns a video's processing job at a time.
    pub async fn transition(&self, video_id: &VideoId, next: VideoStatus) -> RecordResult<()> {
        let current = self
            .get(video_id)
            .await?
            .ok_or_else(|| RecordError::not_found(format!("video {}", video_id)))?;

        if !current.status.can_transition_to(next) {
            return Err(RecordError::Transition(InvalidTransition {
                from: current.status,
                to: next,
            }));
        }

        self.store
            .update(
                collections::VIDEOS,
                &Filter::new().eq("id", video_id.as_str()),
                json!({
                    "status": next,
                    "updated_at": Utc::now(),
                }),
            )
            .await?;

        info!(video_id = %video_id, status = %next, "Video status updated");
        Ok(())
    }

    /// Mark a video ready after successful thumbnail extraction.
    pub async fn mark_ready(&self, video_id: &VideoId) -> RecordResult<()> {
        self.transition(video_id, VideoStatus::Ready).await
    }

    /// Mark a video failed.
    pub async fn mark_failed(&self, video_id: &VideoId) -> RecordResult<()> {
        self.transition(video_id, VideoStatus::Failed).await
    }
}

/// Repository for thumbnail records.
#[derive(Clone)]
pub struct ThumbnailRepository {
    store: Arc<dyn RecordStore>,
}

impl ThumbnailRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Insert a thumbnail record. Called after the image object has been
    /// durably written (write-then-index ordering).
    pub async fn insert(&self, record: &ThumbnailRecord) -> RecordResult<()> {
        self.store
            .insert(collections::THUMBNAILS, serde_json::to_value(record)?)
            .await?;
        info!(video_id = %record.video_id, key = %record.storage_key, "Thumbnail record created");
        Ok(())
    }

    /// List thumbnails for a video.
    pub async fn list_for_video(&self, video_id: &VideoId) -> RecordResult<Vec<ThumbnailRecord>> {
        let rows = self
            .store
            .select(
                collections::THUMBNAILS,
                &Filter::new().eq("video_id", video_id.as_str()),
            )
            .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(RecordError::Json))
            .collect()
    }
}
