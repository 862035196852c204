use crate::adapters::mail::{Envelope, MailTransport, TransportError};
use crate::config::MailConfig;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Builds a STARTTLS relay transport.
    ///
    /// # Errors
    /// Returns an error if the relay cannot be configured for `host`.
    pub fn new(host: &str, config: &MailConfig) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.smtp_timeout_secs)));

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self { mailer: builder.build() })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    #[tracing::instrument(level = "debug", skip(self, envelope), fields(to = %envelope.to), err(Display))]
    async fn send(&self, envelope: Envelope<'_>) -> Result<(), TransportError> {
        let message = Message::builder()
            .from(envelope.from.parse::<Mailbox>().map_err(|e| TransportError(format!("Invalid sender address: {e}")))?)
            .to(envelope.to.parse::<Mailbox>().map_err(|e| TransportError(format!("Invalid recipient address: {e}")))?)
            .subject(envelope.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(envelope.body.to_string())
            .map_err(|e| TransportError(e.to_string()))?;

        self.mailer.send(message).await.map(|_| ()).map_err(|e| TransportError(e.to_string()))
    }
}
