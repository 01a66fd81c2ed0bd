//! The object store trait the processing core is written against.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::StorageResult;

/// Chunked object body.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Object store operations consumed by the processing core.
///
/// Implementations are safe for concurrent use from multiple workers;
/// only per-call atomicity is assumed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open a read stream for an object. Fails with `NotFound` if the
    /// object is absent.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Write an object, overwriting any existing one at the same key.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Generate a time-limited URL for a direct client upload.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<String>;

    /// Generate a time-limited URL for a direct client download.
    async fn presign_download(&self, key: &str, ttl: Duration) -> StorageResult<String>;
}
