//! Outgoing mail.
//!
//! With `mail.server` set, messages go out over SMTP; otherwise they are
//! written to the log so password resets still work in development.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Builds the mailer for `config`.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.server {
        Some(server) => Ok(Arc::new(SmtpMailer::new(config, server)?)),
        None => {
            warn!("No mail server configured, outgoing mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, server: &str) -> Result<Self, MailError> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };

        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(
                mail.from
                    .parse()
                    .map_err(|_| MailError::Address(mail.from.clone()))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|_| MailError::Address(mail.to.clone()))?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!(to = %mail.to, subject = %mail.subject, "Mail sent");
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "Mail not sent (no server configured):\n{}",
            mail.body
        );
        Ok(())
    }
}

/// The password-reset mail for `username` with a link to `reset_url`.
#[must_use]
pub fn reset_password_mail(from: &str, to: &str, username: &str, reset_url: &str) -> OutgoingMail {
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: "[Techinder] Reset Your Password".to_string(),
        body: format!(
            "Dear {username},\n\n\
             To reset your password click on the following link:\n\n\
             {reset_url}\n\n\
             If you have not requested a password reset simply ignore this message.\n\n\
             Sincerely,\n\n\
             The Techinder Team\n"
        ),
    }
}
