//! Outgoing email.
//!
//! Delivery failures are reported to the caller as [`MailError`]; account
//! workflows log and drop them so a flaky relay never fails a request.

use std::sync::{Arc, Mutex};

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("email task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

/// SMTP relay delivery through lettre. A transport is built per message.
#[derive(Clone)]
pub struct SmtpMailer {
    settings: SmtpSettings,
    credentials: Credentials,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());
        Self {
            settings,
            credentials,
        }
    }

    fn build_transport(&self) -> Result<SmtpTransport, MailError> {
        Ok(SmtpTransport::relay(&self.settings.host)
            .map_err(|e| MailError::Smtp(format!("relay error: {e}")))?
            .port(self.settings.port)
            .credentials(self.credentials.clone())
            .build())
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let from = format!("{} <{}>", self.settings.from_name, self.settings.from_email);
        let message = Message::builder()
            .from(from.parse().map_err(|e| MailError::Address(format!("{from}: {e}")))?)
            .to(email
                .to
                .parse()
                .map_err(|e| MailError::Address(format!("{}: {e}", email.to)))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&message)
                .map_err(|e| MailError::Smtp(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Task(e.to_string()))?
        .map(|_| ())
    }
}

/// Keeps every sent email in memory. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    outbox: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails after recording the attempt.
    pub fn failing() -> Self {
        Self {
            outbox: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|email| email.to == to)
    }

    fn record(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(email.clone());
        }
        if self.fail {
            return Err(MailError::Smtp("recording mailer set to fail".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub enum Mailer {
    Smtp(SmtpMailer),
    /// Logs the message instead of delivering it.
    Console,
    Recording(RecordingMailer),
}

impl Mailer {
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        match self {
            Mailer::Smtp(smtp) => smtp.send(email).await?,
            Mailer::Console => {
                info!(
                    to = %email.to,
                    subject = %email.subject,
                    body = %email.html,
                    "Email (console delivery)"
                );
            }
            Mailer::Recording(recording) => recording.record(email)?,
        }
        info!(to = %email.to, "Email sent");
        Ok(())
    }

    /// Sends and swallows failures after logging them.
    pub async fn send_logged(&self, email: &OutgoingEmail) {
        if let Err(e) = self.send(email).await {
            warn!(to = %email.to, error = %e, "Email delivery failed");
        }
    }
}

pub fn verification_email(to: &str, code: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "POP N' PLAN - Your verification code".to_string(),
        html: format!(
            "<p>Your POP N' PLAN verification code is <b>{code}</b>.</p>\
             <p>This code will expire in {} minutes.</p>",
            super::verification::CODE_TTL_MINUTES
        ),
    }
}

pub fn resend_email(to: &str, code: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "POP N' PLAN - Your new verification code".to_string(),
        html: format!(
            "<p>Your new verification code is <b>{code}</b>.</p>\
             <p>This code will expire in {} minutes.</p>",
            super::verification::CODE_TTL_MINUTES
        ),
    }
}
