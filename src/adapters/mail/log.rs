use crate::adapters::mail::{Envelope, MailTransport, TransportError};
use async_trait::async_trait;

/// Logs outgoing mail instead of relaying it. Used when no SMTP host is configured.
#[derive(Debug, Default)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, envelope: Envelope<'_>) -> Result<(), TransportError> {
        tracing::info!(
            from = %envelope.from,
            to = %envelope.to,
            subject = %envelope.subject,
            "SMTP not configured, logging e-mail"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_accepts_every_envelope() {
        let envelope = Envelope { from: "noreply@example.com", to: "anyone@example.com", subject: "Hi", body: "Body" };
        assert!(LogMailTransport.send(envelope).await.is_ok());
    }
}
