//! Team chat notifications for new leads.
//!
//! A [`ChatNotifier`] holds an ordered list of transports and stops at the
//! first one that delivers. It never fails: the result is always a
//! [`ChatOutcome`] describing what happened.

pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ChatError;

pub use slack::{SlackApiTransport, SlackWebhookTransport};

/// A formatted chat message: plain fallback text plus Block Kit blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub blocks: serde_json::Value,
}

/// One way of reaching the team channel.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name used in logs and outcomes.
    fn name(&self) -> &str;

    async fn post_message(&self, message: &ChatMessage) -> Result<(), ChatError>;
}

/// Result of a notification attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOutcome {
    pub delivered: bool,
    /// Transport that delivered the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    /// One entry per failed transport, in the order they were tried.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Set when the notification was never attempted.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl ChatOutcome {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Tries each transport in order until one delivers.
#[derive(Clone, Default)]
pub struct ChatNotifier {
    transports: Vec<Arc<dyn ChatTransport>>,
}

impl ChatNotifier {
    pub fn new(transports: Vec<Arc<dyn ChatTransport>>) -> Self {
        Self { transports }
    }

    pub fn transport_names(&self) -> Vec<&str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    pub async fn notify(&self, message: &ChatMessage) -> ChatOutcome {
        let mut outcome = ChatOutcome::default();

        if self.transports.is_empty() {
            warn!("Lead notification not sent: no chat transport configured");
            outcome.errors.push(ChatError::NotConfigured.to_string());
            return outcome;
        }

        for transport in &self.transports {
            match transport.post_message(message).await {
                Ok(()) => {
                    info!(transport = transport.name(), "Lead notification delivered");
                    outcome.delivered = true;
                    outcome.via = Some(transport.name().to_string());
                    return outcome;
                }
                Err(e) => {
                    warn!(transport = transport.name(), error = %e, "Chat transport failed");
                    outcome.errors.push(e.to_string());
                }
            }
        }

        warn!(
            attempts = outcome.errors.len(),
            "All chat transports failed; lead notification dropped"
        );
        outcome
    }
}
