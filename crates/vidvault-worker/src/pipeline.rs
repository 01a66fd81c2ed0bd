//! Thumbnail extraction pipeline.
//!
//! Streams the uploaded source through the frame extractor and indexes
//! the resulting image. The object is written before the record, and
//! the record before the status flip, so a crash at any point leaves
//! at worst an unreferenced object, never a record pointing at nothing.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};
use vidvault_media::{ExtractorConfig, FrameExtractor};
use vidvault_models::{thumbnail_key, ThumbnailRecord, VideoRecord, VideoStatus};
use vidvault_queue::ProcessVideoJob;
use vidvault_records::{ThumbnailRepository, VideoRepository};
use vidvault_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};

/// Runs thumbnail extraction for one video at a time.
#[derive(Clone)]
pub struct ThumbnailPipeline {
    store: Arc<dyn ObjectStore>,
    videos: VideoRepository,
    thumbnails: ThumbnailRepository,
    extractor_config: ExtractorConfig,
}

impl ThumbnailPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        videos: VideoRepository,
        thumbnails: ThumbnailRepository,
        extractor_config: ExtractorConfig,
    ) -> Self {
        Self {
            store,
            videos,
            thumbnails,
            extractor_config,
        }
    }

    /// Process one video. Returns the thumbnail object key.
    ///
    /// Safe to rerun after a stall or a lost ack: a video already in
    /// its terminal READY state short-circuits, the thumbnail object is
    /// overwritten in place, and a record with the same key is not
    /// inserted twice. Any failure past payload and row resolution
    /// flips the video to FAILED before the error propagates; a
    /// redelivery moves it back to PROCESSING when it retries.
    pub async fn run(&self, job: &ProcessVideoJob) -> WorkerResult<String> {
        job.validate()
            .map_err(|e| WorkerError::invalid_payload(e.to_string()))?;

        let video = self
            .videos
            .get(&job.video_id)
            .await?
            .ok_or_else(|| WorkerError::video_not_found(job.video_id.to_string()))?;

        let key = thumbnail_key(&video.user_id, &job.video_id);

        if video.status == VideoStatus::Ready {
            info!(video_id = %job.video_id, "Video already processed, skipping");
            return Ok(key);
        }

        match self.process(job, &video, &key).await {
            Ok(()) => {
                info!(video_id = %job.video_id, key = %key, "Video ready");
                Ok(key)
            }
            Err(e) => {
                // Best effort; a failed status write must not mask the
                // original error.
                if let Err(status_err) = self.videos.mark_failed(&job.video_id).await {
                    warn!(
                        video_id = %job.video_id,
                        "Could not mark video failed: {}", status_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        job: &ProcessVideoJob,
        video: &VideoRecord,
        key: &str,
    ) -> WorkerResult<()> {
        if !self.store.exists(&job.storage_key).await? {
            return Err(WorkerError::source_missing(job.storage_key.clone()));
        }

        // Same-status no-op in the common case; re-entry from FAILED on
        // a retry.
        self.videos
            .transition(&job.video_id, VideoStatus::Processing)
            .await?;

        let frame = self.extract_frame(&job.storage_key).await?;
        info!(
            video_id = %job.video_id,
            bytes = frame.len(),
            "Extracted thumbnail frame"
        );

        self.store.put(key, frame, "image/jpeg").await?;
        self.index_thumbnail(video, key).await?;
        self.videos.mark_ready(&job.video_id).await?;
        Ok(())
    }

    /// Stream the source object through the extractor.
    async fn extract_frame(&self, storage_key: &str) -> WorkerResult<Vec<u8>> {
        let source = self.store.get_stream(storage_key).await?;
        let source = source.map(|chunk| chunk.map_err(std::io::Error::other));

        let extractor = FrameExtractor::new(self.extractor_config.clone());
        let frame = extractor.extract(source).await?;

        if frame.is_empty() {
            return Err(WorkerError::extraction_failed(
                "extractor produced no image data",
            ));
        }

        Ok(frame)
    }

    /// Insert the thumbnail record unless a rerun already did.
    async fn index_thumbnail(&self, video: &VideoRecord, key: &str) -> WorkerResult<()> {
        let existing = self.thumbnails.list_for_video(&video.id).await?;
        if existing.iter().any(|t| t.storage_key == key) {
            debug!(video_id = %video.id, "Thumbnail record already indexed");
            return Ok(());
        }

        self.thumbnails
            .insert(&ThumbnailRecord::new(video.id.clone(), key))
            .await?;
        Ok(())
    }
}
