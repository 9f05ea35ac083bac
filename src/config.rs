//! Configuration types.
//!
//! Everything is read from the environment once at startup. Credentials are
//! held as [`SecretString`] and never logged.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::chat::slack;
use crate::crm::pipedrive;
use crate::crm::PipedriveConfig;
use crate::error::ConfigError;
use crate::pipeline::LeadSource;

/// Slack delivery settings. Either transport may be absent.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Bot token for the Web API transport.
    pub bot_token: Option<SecretString>,
    pub channel: String,
    pub api_url: String,
    /// Incoming-webhook fallback.
    pub webhook_url: Option<SecretString>,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipedrive: PipedriveConfig,
    pub slack: SlackConfig,
    /// Timeout for every outbound HTTP call.
    pub http_timeout: Duration,
    pub port: u16,
    /// CORS origin for the landing page. Any origin when unset.
    pub allowed_origin: Option<String>,
    /// Sessions idle for longer than this are pruned.
    pub session_idle_timeout: Duration,
    pub lead_source: LeadSource,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| get(key).map(SecretString::from);

        let api_token = secret("PIPEDRIVE_API_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("PIPEDRIVE_API_TOKEN".to_string()))?;

        let defaults = LeadSource::default();

        Ok(Self {
            pipedrive: PipedriveConfig {
                base_url: get("PIPEDRIVE_API_URL")
                    .unwrap_or_else(|| pipedrive::DEFAULT_API_URL.to_string()),
                api_token,
            },
            slack: SlackConfig {
                bot_token: secret("SLACK_BOT_TOKEN"),
                channel: get("SLACK_CHANNEL").unwrap_or_else(|| slack::DEFAULT_CHANNEL.to_string()),
                api_url: get("SLACK_API_URL").unwrap_or_else(|| slack::DEFAULT_API_URL.to_string()),
                webhook_url: secret("SLACK_WEBHOOK_URL"),
            },
            http_timeout: Duration::from_secs(parse_or(&get, "QUOTE_HTTP_TIMEOUT_SECS", 15)?),
            port: parse_or(&get, "QUOTE_PORT", 8080)?,
            allowed_origin: get("QUOTE_ALLOWED_ORIGIN"),
            session_idle_timeout: Duration::from_secs(parse_or(
                &get,
                "QUOTE_SESSION_IDLE_SECS",
                3600,
            )?),
            lead_source: LeadSource {
                source: get("QUOTE_LEAD_SOURCE").unwrap_or(defaults.source),
                campaign: get("QUOTE_CAMPAIGN").unwrap_or(defaults.campaign),
            },
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
