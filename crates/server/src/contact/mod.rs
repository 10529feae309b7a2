//! Contact relay
//!
//! Validates a visitor's contact form and relays it to the site owner.
//! Nothing is sent unless every field passes validation.

pub mod mailer;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::AppState;
use crate::core::error::{Error, Result};
use crate::core::extract::ApiJson;
use crate::core::validate::{is_plausible_email, non_blank};
use mailer::{DeliveryReport, MailError, Mailer, OutgoingMail};

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// A contact submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactRequest {
    pub fn validate(self) -> Result<ContactSubmission> {
        let (Some(name), Some(email), Some(subject), Some(message)) = (
            non_blank(self.name.as_deref()),
            non_blank(self.email.as_deref()),
            non_blank(self.subject.as_deref()),
            non_blank(self.message.as_deref()),
        ) else {
            return Err(Error::Validation("All fields are required".to_string()));
        };

        if !is_plausible_email(&email) {
            return Err(Error::Validation(
                "Please provide a valid email address".to_string(),
            ));
        }

        Ok(ContactSubmission {
            name,
            email,
            subject,
            message,
        })
    }
}

impl ContactSubmission {
    pub fn into_mail(self) -> OutgoingMail {
        // Header values must stay on one line.
        let subject = self.subject.replace(['\r', '\n'], " ");
        OutgoingMail {
            subject: format!("[Portfolio] {}", subject),
            body: format!(
                "From: {} <{}>\nSubject: {}\n\n{}",
                self.name, self.email, subject, self.message
            ),
            reply_to_name: self.name,
            reply_to_email: self.email,
        }
    }
}

pub struct ContactRelay {
    mailer: Option<Arc<dyn Mailer>>,
    timeout: Duration,
}

impl ContactRelay {
    pub fn new(mailer: Option<Arc<dyn Mailer>>, timeout: Duration) -> Self {
        Self { mailer, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.mailer.is_some()
    }

    /// Verify the connection, then send. The whole exchange shares one
    /// timeout.
    pub async fn relay(&self, submission: ContactSubmission) -> Result<DeliveryReport> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or(Error::ServiceNotConfigured("Email service"))?;

        let exchange = async {
            mailer.verify().await.map_err(|e| {
                warn!("[Contact] SMTP verify failed: {}", e);
                Error::UpstreamUnavailable("Email service temporarily unavailable".to_string())
            })?;

            let report = mailer.send(submission.into_mail()).await.map_err(|e| match e {
                MailError::Address(_) => {
                    Error::Validation("Please provide a valid email address".to_string())
                }
                other => {
                    warn!("[Contact] SMTP send failed: {}", other);
                    Error::UpstreamFailure("Failed to send message".to_string())
                }
            })?;

            if report.accepted.is_empty() {
                warn!("[Contact] No recipients accepted: {}", report.response);
                return Err(Error::UpstreamFailure(
                    "Mail server did not accept the message".to_string(),
                ));
            }
            Ok(report)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!("[Contact] SMTP exchange timed out after {:?}", self.timeout);
                Err(Error::UpstreamTimeout("Email service timed out".to_string()))
            }
        }
    }
}

/// POST /contact
pub async fn send_contact(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContactRequest>,
) -> Result<Json<Value>> {
    info!("POST /contact");

    let submission = req.validate()?;
    let report = state.contact.relay(submission).await?;
    info!("[Contact] Message relayed to {:?}", report.accepted);

    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully",
    })))
}
