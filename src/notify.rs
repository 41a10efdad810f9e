// Digest delivery
use crate::config::SmtpConfig;
use crate::digest::{Digest, DigestComposer};
use crate::orchestrator::DealDigest;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum SendError {
    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Could not build message: {0}")]
    MessageError(String),

    #[error("SMTP error: {0}")]
    TransportError(String),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, digest: &Digest) -> Result<(), SendError>;
}

pub fn mailbox(address: &str) -> Result<Mailbox, SendError> {
    address.parse().map_err(|e: lettre::address::AddressError| SendError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Builds the multipart/alternative message (plain text first, HTML second).
pub fn build_message(
    from: &Mailbox,
    to: &Mailbox,
    digest: &Digest,
) -> Result<Message, SendError> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(digest.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            digest.text_body.clone(),
            digest.html_body.clone(),
        ))
        .map_err(|e| SendError::MessageError(e.to_string()))
}

/// Composes and sends the digest for one run, returning the number of deals
/// found. Nothing is sent when the run found no deals; a send failure is
/// logged and does not change the returned count.
pub async fn deliver(deal_digest: &DealDigest, sender: &dyn NotificationSender) -> usize {
    match DigestComposer::new().compose(deal_digest) {
        Some(digest) => {
            if let Err(e) = sender.send(&digest).await {
                error!(error = %e, "Failed to send email");
            }
        }
        None => info!("No deals found below threshold"),
    }

    deal_digest.deal_count()
}

// STARTTLS relay with login, one connection per send
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, SendError> {
        let from = mailbox(&config.sender_email)?;
        let to = mailbox(&config.recipient_email)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| SendError::TransportError(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.sender_email.clone(),
                config.sender_password.clone(),
            ))
            .build();

        Ok(Self { transport, from, to })
    }

    pub fn build_message(&self, digest: &Digest) -> Result<Message, SendError> {
        build_message(&self.from, &self.to, digest)
    }
}

#[async_trait]
impl NotificationSender for SmtpSender {
    async fn send(&self, digest: &Digest) -> Result<(), SendError> {
        let message = self.build_message(digest)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::TransportError(e.to_string()))?;

        info!(deals = digest.deal_count, "Email sent");
        Ok(())
    }
}

// Dry-run sender: writes the digest to the log instead of mailing it
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, digest: &Digest) -> Result<(), SendError> {
        info!(subject = %digest.subject, deals = digest.deal_count, "Dry run, not sending email");
        info!("\n{}", digest.text_body);
        Ok(())
    }
}

#[cfg(test)]
pub mod mock_sender {
    use super::*;
    use parking_lot::Mutex;

    pub struct MockSender {
        fail: bool,
        attempts: Mutex<Vec<Digest>>,
    }

    impl MockSender {
        pub fn new() -> Self {
            Self {
                fail: false,
                attempts: Mutex::new(Vec::new()),
            }
        }

        // Every send is recorded, then rejected
        pub fn failing() -> Self {
            Self {
                fail: true,
                attempts: Mutex::new(Vec::new()),
            }
        }

        pub fn attempts(&self) -> Vec<Digest> {
            self.attempts.lock().clone()
        }
    }

    #[async_trait]
    impl NotificationSender for MockSender {
        async fn send(&self, digest: &Digest) -> Result<(), SendError> {
            self.attempts.lock().push(digest.clone());
            if self.fail {
                return Err(SendError::TransportError("535 Authentication failed".to_string()));
            }
            Ok(())
        }
    }
}
