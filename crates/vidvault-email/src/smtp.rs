//! SMTP email sender implementation.
//!
//! Pointed at the SES SMTP interface in production; any STARTTLS relay
//! works.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::error::{EmailError, EmailResult};
use crate::sender::EmailSender;

/// Configuration for the SMTP sender.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Relay hostname (e.g. `email-smtp.us-east-1.amazonaws.com`)
    pub host: String,
    /// Relay port
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: String,
    /// Verified sender address
    pub from_address: String,
}

impl SmtpConfig {
    /// Create config from environment variables.
    pub fn from_env() -> EmailResult<Self> {
        Ok(Self {
            host: std::env::var("SMTP_HOST")
                .map_err(|_| EmailError::config_error("SMTP_HOST not set"))?,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME")
                .map_err(|_| EmailError::config_error("SMTP_USERNAME not set"))?,
            password: std::env::var("SMTP_PASSWORD")
                .map_err(|_| EmailError::config_error("SMTP_PASSWORD not set"))?,
            from_address: std::env::var("SMTP_FROM_ADDRESS")
                .map_err(|_| EmailError::config_error("SMTP_FROM_ADDRESS not set"))?,
        })
    }
}

/// SMTP email sender.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new sender from configuration.
    pub fn new(config: SmtpConfig) -> EmailResult<Self> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|_| EmailError::config_error("SMTP_FROM_ADDRESS is not a valid mailbox"))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| EmailError::config_error(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        Ok(Self { mailer, from })
    }

    /// Create from environment variables.
    pub fn from_env() -> EmailResult<Self> {
        Self::new(SmtpConfig::from_env()?)
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> EmailResult<()> {
        debug!("Sending email to {}", to);

        let to_addr: Mailbox = to
            .parse()
            .map_err(|_| EmailError::invalid_message(format!("invalid recipient: {}", to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| EmailError::invalid_message(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| EmailError::rejected(e.to_string()))?;

        info!("Email sent to {}", to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_from_address_rejected() {
        let err = SmtpMailer::new(SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            username: "u".to_string(),
            password: "p".to_string(),
            from_address: "not a mailbox".to_string(),
        })
        .err()
        .expect("invalid from address should fail");
        assert!(matches!(err, EmailError::ConfigError(_)));
    }
}
