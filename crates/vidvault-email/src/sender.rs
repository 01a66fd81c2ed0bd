//! The email sender trait the processing core is written against.

use async_trait::async_trait;

use crate::error::EmailResult;

/// Outbound email delivery.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a single HTML email.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> EmailResult<()>;
}
