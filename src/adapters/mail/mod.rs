use async_trait::async_trait;
use thiserror::Error;

pub mod log;
pub mod smtp;

pub use log::LogMailTransport;
pub use smtp::SmtpMailTransport;

/// A transport failure. The message is recorded verbatim on the delivery attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// One outgoing e-mail to a single recipient.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Sends one e-mail.
    ///
    /// # Errors
    /// Returns `TransportError` describing why the relay refused or could not be reached.
    async fn send(&self, envelope: Envelope<'_>) -> Result<(), TransportError>;
}
