use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::debug;

use crate::config::SmtpConfig;
use crate::template::RenderedEmail;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("smtp transport error: {0}")]
    Transport(String),
}

/// Mail-transport seam; the worker is generic over this so tests swap in an
/// in-memory implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, email: &RenderedEmail) -> Result<(), MailerError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|err| MailerError::InvalidAddress(format!("{}: {err}", config.from_address)))?;

        let transport = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                    .map_err(|err| MailerError::Transport(err.to_string()))?
                    .port(config.port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            // No credentials: plain connection for local development relays.
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipient: &str, email: &RenderedEmail) -> Result<(), MailerError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|err| MailerError::InvalidAddress(format!("{recipient}: {err}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.body.clone())
            .map_err(|err| MailerError::Message(err.to_string()))?;

        debug!(recipient, subject = %email.subject, "dispatching email");
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|err| MailerError::Transport(err.to_string()))
    }
}
