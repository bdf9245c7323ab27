//! Outbound mail.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use fnrelay_config::MailConfig;

/// One plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recipient '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// SMTP with STARTTLS, logged in as the sender.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let email = config.smtp_email.as_deref().context("SMTP_EMAIL is not configured")?;
        let password = config
            .smtp_password
            .as_deref()
            .context("SMTP_PASSWORD is not configured")?;
        let from: Mailbox = email
            .parse()
            .with_context(|| format!("SMTP_EMAIL '{email}' is not a valid address"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("Invalid SMTP host '{}'", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(Credentials::new(email.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }

    fn message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let to: Mailbox = mail.to.parse().map_err(|e: lettre::address::AddressError| {
            MailError::Address {
                address: mail.to.clone(),
                reason: e.to_string(),
            }
        })?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = self.message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        debug!(to = %mail.to, "Mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            smtp_email: Some("robot@example.com".into()),
            smtp_password: Some("app-password".into()),
            ..MailConfig::default()
        }
    }

    #[test]
    fn requires_credentials() {
        assert!(SmtpMailer::new(&MailConfig::default()).is_err());
    }

    #[tokio::test]
    async fn builds_plain_text_message() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let message = mailer
            .message(&OutgoingMail {
                to: "alice@example.com".into(),
                subject: "Release".into(),
                body: "v2 is out".into(),
            })
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: robot@example.com"));
        assert!(raw.contains("To: alice@example.com"));
        assert!(raw.contains("Subject: Release"));
        assert!(raw.contains("v2 is out"));
    }

    #[tokio::test]
    async fn bad_recipient_is_address_error() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let err = mailer
            .message(&OutgoingMail {
                to: "not an address".into(),
                subject: String::new(),
                body: String::new(),
            })
            .unwrap_err();
        assert!(matches!(err, MailError::Address { .. }));
    }
}
