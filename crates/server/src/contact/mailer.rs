//! Outbound mail
//!
//! `Mailer` is the seam between the contact relay and SMTP. `SmtpMailer`
//! is the production implementation on top of lettre; tests swap in an
//! in-memory recorder.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

/// SMTP connection and envelope settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub to_email: String,
    /// Also deliver a copy to `from_email`.
    pub bcc_self: bool,
    pub timeout: Duration,
}

/// A message to the site owner on behalf of a visitor.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub reply_to_name: String,
    pub reply_to_email: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub accepted: Vec<String>,
    pub response: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {0}")]
    Address(String),
    #[error("SMTP server unreachable: {0}")]
    Unavailable(String),
    #[error("SMTP send failed: {0}")]
    Send(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Check that the server is reachable and accepts our credentials.
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, mail: OutgoingMail) -> Result<DeliveryReport, MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    bcc_self: bool,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        // 465 is implicit TLS; anything else upgrades with STARTTLS.
        let builder = if settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| MailError::Unavailable(e.to_string()))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        Ok(Self {
            transport,
            from: mailbox(Some(&settings.from_name), &settings.from_email)?,
            to: mailbox(None, &settings.to_email)?,
            bcc_self: settings.bcc_self,
        })
    }

    fn build_message(&self, mail: OutgoingMail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .reply_to(mailbox(Some(&mail.reply_to_name), &mail.reply_to_email)?)
            .to(self.to.clone())
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN);

        if self.bcc_self {
            builder = builder.bcc(self.from.clone());
        }

        builder
            .body(mail.body)
            .map_err(|e| MailError::Send(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Unavailable("connection test failed".to_string())),
            Err(e) => Err(MailError::Unavailable(e.to_string())),
        }
    }

    async fn send(&self, mail: OutgoingMail) -> Result<DeliveryReport, MailError> {
        let message = self.build_message(mail)?;
        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        debug!("[Contact] SMTP response: {:?}", response);
        let accepted = if response.is_positive() {
            recipients
        } else {
            Vec::new()
        };
        info!("[Contact] SMTP accepted {} recipient(s)", accepted.len());

        Ok(DeliveryReport {
            accepted,
            response: response.message().collect::<Vec<_>>().join(" "),
        })
    }
}

fn mailbox(name: Option<&str>, email: &str) -> Result<Mailbox, MailError> {
    let address: Address = email
        .parse()
        .map_err(|_| MailError::Address(email.to_string()))?;
    Ok(Mailbox::new(name.map(str::to_string), address))
}
