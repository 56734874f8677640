use std::sync::Arc;

use crate::app::domain::Email;

/// Message to be sent via any email implementation.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Email,
    pub subject: String,
    pub body: String,
    pub from: String,
}

impl EmailMessage {
    pub fn new(to: Email, subject: impl Into<String>, body: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            body: body.into(),
            from: from.into(),
        }
    }
}

/// Abstract interface for sending email. Swappable per environment.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Errors that can occur during email sending.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Send error: {0}")]
    Send(String),
}

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

mod console;
mod smtp;

/// Send and log any failure. Returns whether the message went out.
pub async fn deliver(mailer: &dyn EmailSender, message: &EmailMessage) -> bool {
    match mailer.send(message).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, to = %message.to.as_str(), subject = %message.subject, "email delivery failed");
            false
        }
    }
}

/// Build the email sender from config.
pub fn from_config(config: &crate::app::config::Config) -> Result<Arc<dyn EmailSender>, EmailError> {
    match config.mail_adapter.as_str() {
        "console" => Ok(Arc::new(ConsoleMailer)),
        "smtp" => {
            let host = config
                .smtp_host
                .clone()
                .ok_or_else(|| EmailError::Config("SMTP_HOST is required for SMTP adapter".to_string()))?;

            Ok(Arc::new(SmtpMailer::new(
                &host,
                config.smtp_port,
                config.smtp_user.clone().zip(config.smtp_pass.clone()),
                &config.mail_from,
            )?))
        }
        other => Err(EmailError::Config(format!("Unknown MAIL_ADAPTER: {}", other))),
    }
}
