use async_trait::async_trait;

use super::{EmailError, EmailMessage, EmailSender};

/// Development sender: writes the message to the log instead of the network.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl EmailSender for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to.as_str(),
            from = %message.from,
            subject = %message.subject,
            body = %message.body,
            "email (console adapter)"
        );
        Ok(())
    }
}
