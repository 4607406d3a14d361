//! Outbound email
//!
//! Production sends through an SMTP relay. Without credentials, messages
//! are only logged, and tests capture them in an in-memory outbox.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// SMTP relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Display name on the From header
    pub from_name: String,
}

#[derive(Clone)]
pub enum Mailer {
    Smtp(SmtpMailer),
    /// Logs each message instead of sending it
    Log,
    Memory(Outbox),
}

impl Mailer {
    /// Must be called inside a Tokio runtime; the connection pool starts a
    /// background task on construction.
    pub fn smtp(settings: &SmtpSettings) -> Result<Self> {
        SmtpMailer::new(settings).map(Self::Smtp)
    }

    pub async fn send(&self, email: Email) -> Result<()> {
        match self {
            Self::Smtp(smtp) => smtp.send(email).await,
            Self::Log => {
                info!(to = %email.to, subject = %email.subject, "Email delivery disabled, not sending");
                debug!("{}", email.html);
                Ok(())
            }
            Self::Memory(outbox) => outbox.push(email),
        }
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Requires a running Tokio runtime, see [`Mailer::smtp`]
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .with_context(|| format!("Invalid SMTP host: {}", settings.host))?
            .port(settings.port)
            .credentials(credentials)
            .build();

        let from: Mailbox = format!("\"{}\" <{}>", settings.from_name, settings.username)
            .parse()
            .context("Invalid sender address")?;

        Ok(Self { transport, from })
    }

    async fn send(&self, email: Email) -> Result<()> {
        let to: Mailbox = email
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", email.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .context("Failed to build email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        debug!("Email sent");
        Ok(())
    }
}

/// Captured emails, shared between clones
#[derive(Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<Email>>>,
    failing: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox that rejects every delivery
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Email> {
        self.sent().pop()
    }

    fn push(&self, email: Email) -> Result<()> {
        if self.failing {
            bail!("Outbox rejected email to {}", email.to);
        }

        self.sent
            .lock()
            .map_err(|_| anyhow!("Outbox lock poisoned"))?
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Hello".to_string(),
            html: "<p>hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_outbox_captures() {
        let outbox = Outbox::new();
        let mailer = Mailer::Memory(outbox.clone());

        mailer.send(email("a@b.co")).await.unwrap();
        mailer.send(email("c@d.co")).await.unwrap();

        assert_eq!(outbox.sent().len(), 2);
        assert_eq!(outbox.last().unwrap().to, "c@d.co");
    }

    #[tokio::test]
    async fn test_failing_outbox() {
        let outbox = Outbox::failing();
        let mailer = Mailer::Memory(outbox.clone());

        assert!(mailer.send(email("a@b.co")).await.is_err());
        assert!(outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        assert!(Mailer::Log.send(email("a@b.co")).await.is_ok());
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds() {
        let settings = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 465,
            username: "sender@example.com".to_string(),
            password: "app-password".to_string(),
            from_name: "Todo App".to_string(),
        };
        assert!(Mailer::smtp(&settings).is_ok());
    }
}
