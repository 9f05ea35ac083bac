//! Slack transports: Web API with a bot token, and an incoming webhook.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, ChatTransport};
use crate::error::ChatError;

pub const DEFAULT_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_CHANNEL: &str = "#leads";

/// Posts through `chat.postMessage` with a bearer token.
pub struct SlackApiTransport {
    api_url: String,
    token: SecretString,
    channel: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackApiTransport {
    pub fn new(
        api_url: impl Into<String>,
        token: SecretString,
        channel: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            token,
            channel: channel.into(),
            client,
        }
    }

    fn send_failed(&self, reason: impl Into<String>) -> ChatError {
        ChatError::SendFailed {
            name: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for SlackApiTransport {
    fn name(&self) -> &str {
        "slack_api"
    }

    async fn post_message(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let body = PostMessageBody {
            channel: &self.channel,
            text: &message.text,
            blocks: &message.blocks,
        };
        debug!(channel = %self.channel, "Posting lead to Slack Web API");

        let response = self
            .client
            .post(format!(
                "{}/chat.postMessage",
                self.api_url.trim_end_matches('/')
            ))
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Rejected {
                name: self.name().to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        let parsed: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| self.send_failed(format!("invalid response: {e}")))?;

        if !parsed.ok {
            return Err(ChatError::Rejected {
                name: self.name().to_string(),
                reason: parsed.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

/// Posts to an incoming-webhook URL bound to a single channel.
pub struct SlackWebhookTransport {
    /// The URL embeds the credential.
    url: SecretString,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    text: &'a str,
    blocks: &'a serde_json::Value,
}

impl SlackWebhookTransport {
    pub fn new(url: SecretString, client: reqwest::Client) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl ChatTransport for SlackWebhookTransport {
    fn name(&self) -> &str {
        "slack_webhook"
    }

    async fn post_message(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let body = WebhookBody {
            text: &message.text,
            blocks: &message.blocks,
        };
        debug!("Posting lead to Slack webhook");

        let response = self
            .client
            .post(self.url.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::SendFailed {
                name: self.name().to_string(),
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Rejected {
                name: self.name().to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }
        Ok(())
    }
}
