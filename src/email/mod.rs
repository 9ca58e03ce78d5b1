//! Owner emails over SMTP.

mod owner;
mod templates;

pub use owner::OwnerMailer;
pub use templates::{MailContext, MailTemplates, DECOMMISSION_SUBJECT, RENEWAL_SUBJECT};

use crate::config::EmailSettings;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail configuration: {0}")]
    Config(String),

    #[error("Invalid recipient '{0}'")]
    Recipient(String),

    #[error("Failed to render template: {0}")]
    Template(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// STARTTLS relay when credentials are set, plain SMTP otherwise.
    pub fn new(settings: &EmailSettings) -> Result<Self, MailError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|err: lettre::address::AddressError| MailError::Config(err.to_string()))?;

        let transport = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|err| MailError::Config(err.to_string()))?
                    .port(settings.port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            _ => {
                info!("Using unauthenticated SMTP to {}", settings.host);
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                    .port(settings.port)
                    .build()
            }
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| MailError::Recipient(message.to.clone()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .map_err(|err| MailError::Smtp(err.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|err| MailError::Smtp(err.to_string()))?;

        debug!("Sent '{}' to {}", message.subject, message.to);
        Ok(())
    }
}

/// Used when no mail server is configured.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        debug!(
            "Email disabled, not sending '{}' to {}",
            message.subject, message.to
        );
        Ok(())
    }
}

pub fn create_mailer(settings: Option<&EmailSettings>) -> Result<Arc<dyn Mailer>, MailError> {
    match settings {
        Some(settings) => {
            info!(
                "Sending email through {}:{} as {}",
                settings.host, settings.port, settings.from
            );
            Ok(Arc::new(SmtpMailer::new(settings)?))
        }
        None => {
            info!("No email configuration, owner emails are disabled");
            Ok(Arc::new(NoopMailer))
        }
    }
}
