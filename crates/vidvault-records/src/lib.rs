//! Record store adapter for VidVault.
//!
//! This crate provides:
//! - The `RecordStore` trait: insert/update/select/delete against named
//!   collections, no transactions assumed
//! - A Supabase PostgREST implementation over HTTP
//! - Typed repositories for video and thumbnail records

pub mod error;
pub mod postgrest;
pub mod repos;
pub mod store;

pub use error::{RecordError, RecordResult};
pub use postgrest::{RecordStoreConfig, RestRecordStore};
pub use repos::{ThumbnailRepository, VideoRepository};
pub use store::{Filter, RecordStore, Row};
