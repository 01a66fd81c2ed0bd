//! Object store adapter for VidVault.
//!
//! This crate provides:
//! - The `ObjectStore` trait the processing core is written against
//! - An S3 implementation (source videos and extracted thumbnails)
//! - Presigned upload/download URL generation

pub mod error;
pub mod s3;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use s3::{S3Config, S3Store};
pub use store::{ByteStream, ObjectStore};
