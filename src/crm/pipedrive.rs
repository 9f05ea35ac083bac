//! Pipedrive REST client.
//!
//! Talks to the v1 API with the `api_token` query parameter. Responses use
//! the `{success, data, error}` envelope; `success: false` is treated like a
//! non-2xx status.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ContactId, CrmClient, DealId, DealUpdate, NewContact, NewDeal};
use crate::error::CrmError;

pub const DEFAULT_API_URL: &str = "https://api.pipedrive.com/v1";

/// Record visibility: the entire company.
const VISIBLE_TO_COMPANY: u8 = 3;

#[derive(Debug, Clone)]
pub struct PipedriveConfig {
    pub base_url: String,
    pub api_token: SecretString,
}

pub struct PipedriveClient {
    config: PipedriveConfig,
    client: reqwest::Client,
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ContactValue<'a> {
    value: &'a str,
    primary: bool,
}

#[derive(Debug, Serialize)]
struct PersonPayload<'a> {
    name: &'a str,
    email: Vec<ContactValue<'a>>,
    phone: Vec<ContactValue<'a>>,
    visible_to: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

impl<'a> From<&'a NewContact> for PersonPayload<'a> {
    fn from(contact: &'a NewContact) -> Self {
        Self {
            name: &contact.name,
            email: vec![ContactValue {
                value: &contact.email,
                primary: true,
            }],
            phone: vec![ContactValue {
                value: &contact.phone,
                primary: true,
            }],
            visible_to: VISIBLE_TO_COMPANY,
            notes: contact.address_note.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DealPayload<'a> {
    title: &'a str,
    person_id: ContactId,
    visible_to: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&'a NewDeal> for DealPayload<'a> {
    fn from(deal: &'a NewDeal) -> Self {
        // A deal carrying details is opened explicitly; a bare one takes the
        // account defaults.
        let detailed = deal.description.is_some() || deal.value.is_some();
        Self {
            title: &deal.title,
            person_id: deal.contact_id,
            visible_to: VISIBLE_TO_COMPANY,
            status: detailed.then_some("open"),
            value: deal.value.and_then(|v| v.to_f64()),
            currency: deal.currency.as_deref(),
            description: deal.description.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct NotePayload<'a> {
    content: &'a str,
    deal_id: DealId,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: u64,
}

// ── Client ──────────────────────────────────────────────────────────────

impl PipedriveClient {
    pub fn new(config: PipedriveConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CrmError> {
        let response = request
            .query(&[("api_token", self.config.api_token.expose_secret())])
            .send()
            .await
            .map_err(|e| CrmError::Transport {
                operation: operation.to_string(),
                // The URL carries the token.
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CrmError::Transport {
            operation: operation.to_string(),
            reason: e.without_url().to_string(),
        })?;

        if !status.is_success() {
            return Err(CrmError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| CrmError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        if !envelope.success {
            return Err(CrmError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: envelope.error.unwrap_or(body),
            });
        }

        envelope.data.ok_or_else(|| CrmError::InvalidResponse {
            operation: operation.to_string(),
            reason: "response has no data".to_string(),
        })
    }
}

#[async_trait]
impl CrmClient for PipedriveClient {
    async fn create_contact(&self, contact: &NewContact) -> Result<ContactId, CrmError> {
        let payload = PersonPayload::from(contact);
        debug!(name = %contact.name, "Creating Pipedrive person");

        let created: Created = self
            .send("create_contact", self.client.post(self.url("persons")).json(&payload))
            .await?;

        info!(contact_id = created.id, "Pipedrive person created");
        Ok(created.id)
    }

    async fn create_deal(&self, deal: &NewDeal) -> Result<DealId, CrmError> {
        let payload = DealPayload::from(deal);
        debug!(contact_id = deal.contact_id, title = %deal.title, "Creating Pipedrive deal");

        let created: Created = self
            .send("create_deal", self.client.post(self.url("deals")).json(&payload))
            .await?;

        info!(deal_id = created.id, "Pipedrive deal created");
        Ok(created.id)
    }

    async fn update_deal(&self, deal_id: DealId, update: &DealUpdate) -> Result<(), CrmError> {
        let payload = serde_json::json!({ "description": update.description });

        let _: serde_json::Value = self
            .send(
                "update_deal",
                self.client
                    .put(self.url(&format!("deals/{deal_id}")))
                    .json(&payload),
            )
            .await?;

        info!(deal_id, "Pipedrive deal updated");
        Ok(())
    }

    async fn add_note(&self, deal_id: DealId, text: &str) -> Result<(), CrmError> {
        let payload = NotePayload {
            content: text,
            deal_id,
        };

        let _: serde_json::Value = self
            .send("add_note", self.client.post(self.url("notes")).json(&payload))
            .await?;

        info!(deal_id, "Pipedrive note added");
        Ok(())
    }
}
