//! Frame extractor subprocess wrapper for VidVault.
//!
//! This crate provides:
//! - Resolution of the external frame extractor executable (ffmpeg)
//! - Streaming a video into the extractor's stdin while draining the
//!   single-frame image from its stdout
//! - Classification of expected early pipe closure vs genuine I/O errors

pub mod error;
pub mod extractor;

pub use error::{MediaError, MediaResult};
pub use extractor::{format_offset, ExtractorConfig, FrameExtractor};
