//! Outbound email adapter for VidVault.
//!
//! This crate provides:
//! - The `EmailSender` trait (send(to, subject, html_body))
//! - An SMTP implementation (SES SMTP interface in production)
//!
//! Delivery is best-effort by policy: the email job handler logs
//! provider rejections and reports the job completed anyway.

pub mod error;
pub mod sender;
pub mod smtp;

pub use error::{EmailError, EmailResult};
pub use sender::EmailSender;
pub use smtp::{SmtpConfig, SmtpMailer};
