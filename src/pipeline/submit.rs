//! Lead submission: CRM contact, deal, description, then team chat.
//!
//! **Core invariant: a created contact is never lost.** Deal creation and
//! description delivery fall back through ordered strategy lists, and the
//! chat notification goes out even when no deal could be created.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::description::{chat_message, deal_description, deal_title};
use super::types::{
    AttemptKind, DealStrategy, DeliveryAttempt, DescriptionDelivery, DescriptionStrategy,
    LeadRecord, SubmissionOutcome,
};
use crate::chat::ChatNotifier;
use crate::crm::{ContactId, CrmClient, DealId, DealUpdate, NewContact, NewDeal};
use crate::error::CrmError;

const DEAL_CURRENCY: &str = "EUR";

pub struct SubmissionPipeline {
    crm: Arc<dyn CrmClient>,
    chat: ChatNotifier,
}

fn record<T>(attempts: &mut Vec<DeliveryAttempt>, kind: AttemptKind, result: &Result<T, CrmError>) {
    if let Err(e) = result {
        warn!(attempt = %kind, transport = e.is_transport(), error = %e, "CRM call failed");
    }
    attempts.push(DeliveryAttempt {
        kind,
        succeeded: result.is_ok(),
        error: result.as_ref().err().map(|e| e.to_string()),
    });
}

impl SubmissionPipeline {
    pub fn new(crm: Arc<dyn CrmClient>, chat: ChatNotifier) -> Self {
        Self { crm, chat }
    }

    /// Deliver one lead. Never fails; the outcome says what got through.
    pub async fn submit(&self, lead: &LeadRecord) -> SubmissionOutcome {
        let mut outcome = SubmissionOutcome::new(lead.metadata.submitted_at);
        let service = lead.service_type().map(|s| s.to_string());
        info!(service = service.as_deref().unwrap_or("none"), "Submitting lead");

        // Step A1: contact
        let contact = NewContact {
            name: lead.contact.name.clone(),
            email: lead.contact.email.clone(),
            phone: lead.contact.phone.clone(),
            address_note: (!lead.contact.address.is_empty())
                .then(|| format!("Adres: {}", lead.contact.address)),
        };
        let result = self.crm.create_contact(&contact).await;
        record(&mut outcome.attempts, AttemptKind::CreateContact, &result);
        let contact_id = match result {
            Ok(id) => id,
            Err(_) => {
                error!("Contact creation failed; lead not delivered");
                return outcome;
            }
        };
        outcome.contact_id = Some(contact_id);

        // Step A2: deal
        let title = deal_title(lead);
        let description = deal_description(lead);
        if let Some((deal_id, strategy)) = self
            .create_deal(contact_id, &title, &description, &mut outcome.attempts)
            .await
        {
            outcome.deal_id = Some(deal_id);
            outcome.deal_strategy = Some(strategy);

            // Step A3: description, only when the deal went out without it
            outcome.description = if strategy.carries_description() {
                DescriptionDelivery::WithDeal
            } else {
                self.deliver_description(deal_id, &description, &mut outcome.attempts)
                    .await
            };
        } else {
            error!(contact_id, "Every deal strategy failed; contact kept without deal");
        }

        // Step B: team chat
        outcome.chat = self.chat.notify(&chat_message(lead)).await;

        outcome.success = outcome.contact_id.is_some() && outcome.deal_id.is_some();
        info!(
            success = outcome.success,
            contact_id,
            deal_id = outcome.deal_id,
            failed_attempts = outcome.failed_attempts(),
            chat_delivered = outcome.chat.delivered,
            "Lead submission finished"
        );
        outcome
    }

    async fn create_deal(
        &self,
        contact_id: ContactId,
        title: &str,
        description: &str,
        attempts: &mut Vec<DeliveryAttempt>,
    ) -> Option<(DealId, DealStrategy)> {
        for strategy in DealStrategy::ORDER {
            let deal = match strategy {
                DealStrategy::FullPayload => NewDeal {
                    contact_id,
                    title: title.to_string(),
                    description: Some(description.to_string()),
                    value: Some(Decimal::ZERO),
                    currency: Some(DEAL_CURRENCY.to_string()),
                },
                DealStrategy::Minimal => NewDeal::minimal(contact_id, title),
            };

            let result = self.crm.create_deal(&deal).await;
            record(attempts, AttemptKind::CreateDeal(strategy), &result);
            if let Ok(deal_id) = result {
                info!(deal_id, strategy = ?strategy, "Deal created");
                return Some((deal_id, strategy));
            }
        }
        None
    }

    async fn deliver_description(
        &self,
        deal_id: DealId,
        description: &str,
        attempts: &mut Vec<DeliveryAttempt>,
    ) -> DescriptionDelivery {
        for strategy in DescriptionStrategy::ORDER {
            let result = match strategy {
                DescriptionStrategy::UpdateDeal => {
                    let update = DealUpdate {
                        description: description.to_string(),
                    };
                    self.crm.update_deal(deal_id, &update).await
                }
                DescriptionStrategy::Note => self.crm.add_note(deal_id, description).await,
            };

            record(attempts, AttemptKind::Description(strategy), &result);
            if result.is_ok() {
                info!(deal_id, strategy = ?strategy, "Deal description delivered");
                return match strategy {
                    DescriptionStrategy::UpdateDeal => DescriptionDelivery::UpdatedDeal,
                    DescriptionStrategy::Note => DescriptionDelivery::Note,
                };
            }
        }

        warn!(deal_id, "Deal kept without description");
        DescriptionDelivery::Lost
    }
}
