//! Recording CRM and chat stubs shared by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use super::types::{LeadMetadata, LeadRecord};
use crate::chat::{ChatMessage, ChatTransport};
use crate::crm::{ContactId, CrmClient, DealId, DealUpdate, NewContact, NewDeal};
use crate::error::{ChatError, CrmError};
use crate::wizard::model::{
    AddOns, Consumption, Contact, HouseAge, RoofType, ServiceAnswers, Slot, SolarAnswers,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CrmCall {
    CreateContact(NewContact),
    CreateDeal(NewDeal),
    UpdateDeal(DealId, DealUpdate),
    AddNote(DealId, String),
}

/// CRM stub that records every call. Contacts get id 42, deals id 123.
#[derive(Default)]
pub struct RecordingCrm {
    pub fail_contact: bool,
    /// Number of leading `create_deal` calls that fail.
    pub deal_failures: usize,
    pub fail_update: bool,
    pub fail_note: bool,
    /// When set, `create_contact` waits for a notification first.
    pub gate: Option<Arc<Notify>>,
    pub(crate) calls: Mutex<Vec<CrmCall>>,
}

impl RecordingCrm {
    pub fn calls(&self) -> Vec<CrmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn contact_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CrmCall::CreateContact(_)))
            .count()
    }

    pub fn deal_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CrmCall::CreateDeal(_)))
            .count()
    }

    fn push(&self, call: CrmCall) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len()
    }
}

fn rejected(operation: &str) -> CrmError {
    CrmError::Rejected {
        operation: operation.to_string(),
        status: 400,
        body: "stubbed failure".to_string(),
    }
}

#[async_trait]
impl CrmClient for RecordingCrm {
    async fn create_contact(&self, contact: &NewContact) -> Result<ContactId, CrmError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.push(CrmCall::CreateContact(contact.clone()));
        if self.fail_contact {
            return Err(CrmError::Transport {
                operation: "create_contact".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(42)
    }

    async fn create_deal(&self, deal: &NewDeal) -> Result<DealId, CrmError> {
        self.push(CrmCall::CreateDeal(deal.clone()));
        if self.deal_calls() <= self.deal_failures {
            return Err(rejected("create_deal"));
        }
        Ok(123)
    }

    async fn update_deal(&self, deal_id: DealId, update: &DealUpdate) -> Result<(), CrmError> {
        self.push(CrmCall::UpdateDeal(deal_id, update.clone()));
        if self.fail_update {
            return Err(rejected("update_deal"));
        }
        Ok(())
    }

    async fn add_note(&self, deal_id: DealId, text: &str) -> Result<(), CrmError> {
        self.push(CrmCall::AddNote(deal_id, text.to_string()));
        if self.fail_note {
            return Err(rejected("add_note"));
        }
        Ok(())
    }
}

/// Chat transport stub with a fixed result.
pub struct RecordingChat {
    succeed: bool,
    messages: Mutex<Vec<ChatMessage>>,
}

impl RecordingChat {
    pub fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingChat {
    fn name(&self) -> &str {
        "recording"
    }

    async fn post_message(&self, message: &ChatMessage) -> Result<(), ChatError> {
        self.messages.lock().unwrap().push(message.clone());
        if self.succeed {
            Ok(())
        } else {
            Err(ChatError::SendFailed {
                name: "recording".to_string(),
                reason: "timed out".to_string(),
            })
        }
    }
}

pub fn sample_lead() -> LeadRecord {
    LeadRecord {
        contact: Contact {
            name: "Jan Peeters".to_string(),
            phone: "0471 23 45 67".to_string(),
            email: "jan@example.be".to_string(),
            address: "Kerkstraat 1, 9000 Gent".to_string(),
        },
        service: Some(ServiceAnswers::Solar(SolarAnswers {
            roof_type: Slot::Chosen(RoofType::Pitched),
            house_age: Slot::Chosen(HouseAge::OlderThanTenYears),
            consumption: Slot::Chosen(Consumption::Average),
        })),
        add_ons: AddOns::default(),
        metadata: LeadMetadata {
            source: "website_form".to_string(),
            campaign: "solar_calculator".to_string(),
            submitted_at: Utc::now(),
        },
    }
}
