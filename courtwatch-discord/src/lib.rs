//! Notification sink posting plain messages to a Discord channel webhook.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use courtwatch_core::ports::{NotificationSink, PortError};

/// Longest message content Discord accepts.
pub const MAX_CONTENT_CHARS: usize = 2000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const WEBHOOK_PREFIXES: [&str; 2] = [
    "https://discord.com/api/webhooks/",
    "https://discordapp.com/api/webhooks/",
];

#[derive(Debug, Serialize)]
struct WebhookMessage<'msg> {
    content: &'msg str,
}

/// Error body Discord returns on rate limiting.
#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: Option<f64>,
}

/// Sends messages to one Discord webhook.
pub struct DiscordWebhookSink {
    client: Client,
    webhook_url: String,
}

impl DiscordWebhookSink {
    /// Create a sink for `webhook_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Notification`] when the URL is not a Discord webhook URL,
    /// or a network error when the HTTP client cannot be built.
    pub fn new<S: Into<String>>(webhook_url: S) -> Result<Self, PortError> {
        let webhook_url = webhook_url.into();
        if !WEBHOOK_PREFIXES
            .iter()
            .any(|prefix| webhook_url.starts_with(prefix))
        {
            return Err(PortError::Notification(
                "webhook URL must start with https://discord.com/api/webhooks/".to_owned(),
            ));
        }

        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    async fn send(&self, text: &str) -> Result<(), PortError> {
        check_length(text)?;

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookMessage { content: text })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord message delivered");
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .json::<RateLimited>()
                .await
                .ok()
                .and_then(|body| body.retry_after)
                .unwrap_or_default();
            return Err(PortError::Notification(format!(
                "rate limited, retry after {retry_after}s"
            )));
        }

        let body = response.text().await.unwrap_or_default();
        Err(PortError::Notification(format!(
            "webhook returned {status}: {body}"
        )))
    }
}

fn check_length(text: &str) -> Result<(), PortError> {
    let chars = text.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(PortError::Notification(format!(
            "message has {chars} characters, limit is {MAX_CONTENT_CHARS}"
        )));
    }
    Ok(())
}
