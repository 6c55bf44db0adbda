use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::EmailConfig;
use crate::services::notifier::{EmailMessage, Mailer};

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

/// Client for the Resend transactional email API.
#[derive(Debug, Clone)]
pub struct ResendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ResendClient {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("HobbyList/1.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_shared_client(client, config))
    }

    #[must_use]
    pub fn with_shared_client(client: Client, config: &EmailConfig) -> Self {
        Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Submits one message and returns the provider's message id.
    pub async fn send_email(&self, message: &EmailMessage) -> Result<String> {
        let url = format!("{}/emails", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .context("Failed to reach email provider")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => bail!(
                    "Email provider rejected message: status={status}, {}: {}",
                    err.name,
                    err.message
                ),
                Err(_) => bail!("Email provider rejected message: status={status}, body={body}"),
            }
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .context("Unexpected email provider response")?;

        debug!(message_id = %sent.id, "Email accepted by provider");
        Ok(sent.id)
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.send_email(message).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = EmailConfig {
            api_url: "https://api.resend.com/".to_string(),
            api_key: "re_test".to_string(),
            ..EmailConfig::default()
        };
        let client = ResendClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://api.resend.com");
    }

    #[test]
    fn message_serializes_to_provider_shape() {
        let message = EmailMessage {
            from: "HobbyList <onboarding@resend.dev>".to_string(),
            to: vec!["user@example.com".to_string()],
            subject: "Verify your email".to_string(),
            html: "<p>hi</p>".to_string(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["to"][0], "user@example.com");
        assert_eq!(json["from"], "HobbyList <onboarding@resend.dev>");
        assert_eq!(json["html"], "<p>hi</p>");
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_error() {
        let config = EmailConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: "re_test".to_string(),
            request_timeout_seconds: 2,
            ..EmailConfig::default()
        };
        let client = ResendClient::new(&config).unwrap();
        let message = EmailMessage {
            from: "a@example.com".to_string(),
            to: vec!["b@example.com".to_string()],
            subject: "s".to_string(),
            html: "h".to_string(),
        };
        assert!(client.send(&message).await.is_err());
    }
}
