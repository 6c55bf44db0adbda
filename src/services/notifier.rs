//! Outbound account emails.
//!
//! [`Notifier::send`] is best-effort: provider errors are logged and counted,
//! never returned. Callers cannot observe whether delivery succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EmailConfig;
use crate::domain::TokenPurpose;

/// A fully rendered message ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Transport for rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Subject line for a token email.
#[must_use]
pub const fn subject_for(purpose: TokenPurpose) -> &'static str {
    match purpose {
        TokenPurpose::EmailVerification => "Verify your email",
        TokenPurpose::PasswordReset => "Reset your password",
    }
}

/// HTML body with the link embedded as both href and text.
#[must_use]
pub fn render_body(purpose: TokenPurpose, url: &str) -> String {
    let lead = match purpose {
        TokenPurpose::EmailVerification => "Click the link to verify your account:",
        TokenPurpose::PasswordReset => "Click the link to reset your password:",
    };
    let href = html_escape::encode_double_quoted_attribute(url);
    let text = html_escape::encode_text(url);

    format!("<p>{lead} <a href=\"{href}\">{text}</a></p>")
}

pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
    from: String,
    override_recipient: Option<String>,
}

impl Notifier {
    #[must_use]
    pub fn new(config: &EmailConfig, mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self {
            mailer,
            from: config.from.clone(),
            override_recipient: config.override_recipient.clone(),
        }
    }

    #[must_use]
    pub fn compose(&self, purpose: TokenPurpose, destination: &str, url: &str) -> EmailMessage {
        let to = self
            .override_recipient
            .clone()
            .unwrap_or_else(|| destination.to_string());

        EmailMessage {
            from: self.from.clone(),
            to: vec![to],
            subject: subject_for(purpose).to_string(),
            html: render_body(purpose, url),
        }
    }

    /// Sends the email for `purpose`. Never fails.
    pub async fn send(&self, purpose: TokenPurpose, destination: &str, url: &str) {
        let Some(mailer) = &self.mailer else {
            info!(purpose = %purpose, "Email delivery disabled; skipping send");
            debug!(destination, url, "Undelivered link");
            record_outcome(purpose, "skipped");
            return;
        };

        let message = self.compose(purpose, destination, url);
        debug!(purpose = %purpose, destination, "Sending account email");

        match mailer.send(&message).await {
            Ok(()) => {
                info!(purpose = %purpose, "Sent account email");
                record_outcome(purpose, "sent");
            }
            Err(e) => {
                warn!(purpose = %purpose, error = %e, "Failed to send account email");
                record_outcome(purpose, "failed");
            }
        }
    }
}

fn record_outcome(purpose: TokenPurpose, outcome: &'static str) {
    metrics::counter!(
        "verification_emails_total",
        "purpose" => purpose.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
