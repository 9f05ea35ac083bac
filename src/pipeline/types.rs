//! Shared types for the lead submission pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ChatOutcome;
use crate::crm::{ContactId, DealId};
use crate::wizard::model::{AddOns, Answers, Contact, ServiceAnswers, ServiceType};

pub const DEFAULT_LEAD_SOURCE: &str = "website_form";
pub const DEFAULT_CAMPAIGN: &str = "solar_calculator";

// ── Lead ────────────────────────────────────────────────────────────

/// Where leads come from, stamped on every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSource {
    pub source: String,
    pub campaign: String,
}

impl Default for LeadSource {
    fn default() -> Self {
        Self {
            source: DEFAULT_LEAD_SOURCE.to_string(),
            campaign: DEFAULT_CAMPAIGN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadMetadata {
    pub source: String,
    pub campaign: String,
    pub submitted_at: DateTime<Utc>,
}

/// A completed, validated wizard run ready to hand to the CRM and chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    /// Contact details with surrounding whitespace removed.
    pub contact: Contact,
    /// `None` only when the visitor skipped the service question.
    pub service: Option<ServiceAnswers>,
    pub add_ons: AddOns,
    pub metadata: LeadMetadata,
}

impl LeadRecord {
    pub fn from_answers(answers: &Answers, source: &LeadSource) -> Self {
        Self {
            contact: answers.contact.trimmed(),
            service: answers.service.clone(),
            add_ons: answers.add_ons.clone(),
            metadata: LeadMetadata {
                source: source.source.clone(),
                campaign: source.campaign.clone(),
                submitted_at: Utc::now(),
            },
        }
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        self.service.as_ref().map(ServiceAnswers::service_type)
    }
}

// ── Strategies ──────────────────────────────────────────────────────

/// Ways to create the deal, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStrategy {
    /// Title, contact, status, value, currency and the full description.
    FullPayload,
    /// Title and contact only.
    Minimal,
}

impl DealStrategy {
    pub const ORDER: [DealStrategy; 2] = [Self::FullPayload, Self::Minimal];

    /// Whether a deal created this way already holds the description.
    pub fn carries_description(&self) -> bool {
        matches!(self, Self::FullPayload)
    }
}

/// Ways to attach the description to a deal created without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionStrategy {
    UpdateDeal,
    Note,
}

impl DescriptionStrategy {
    pub const ORDER: [DescriptionStrategy; 2] = [Self::UpdateDeal, Self::Note];
}

/// Which remote call an attempt made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "strategy", rename_all = "snake_case")]
pub enum AttemptKind {
    CreateContact,
    CreateDeal(DealStrategy),
    Description(DescriptionStrategy),
}

impl std::fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateContact => write!(f, "create_contact"),
            Self::CreateDeal(DealStrategy::FullPayload) => write!(f, "deal_full_payload"),
            Self::CreateDeal(DealStrategy::Minimal) => write!(f, "deal_minimal"),
            Self::Description(DescriptionStrategy::UpdateDeal) => {
                write!(f, "description_update_deal")
            }
            Self::Description(DescriptionStrategy::Note) => write!(f, "description_note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub kind: AttemptKind,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How the deal description ended up in the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionDelivery {
    /// Sent along with the deal itself.
    WithDeal,
    UpdatedDeal,
    Note,
    /// Every strategy failed; the deal exists without details.
    Lost,
    /// No deal was created.
    NotAttempted,
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Aggregate result of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Contact and deal both exist in the CRM.
    pub success: bool,
    pub contact_id: Option<ContactId>,
    pub deal_id: Option<DealId>,
    pub deal_strategy: Option<DealStrategy>,
    pub description: DescriptionDelivery,
    pub attempts: Vec<DeliveryAttempt>,
    pub chat: ChatOutcome,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionOutcome {
    pub(crate) fn new(submitted_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            contact_id: None,
            deal_id: None,
            deal_strategy: None,
            description: DescriptionDelivery::NotAttempted,
            attempts: Vec::new(),
            chat: ChatOutcome::skipped(),
            submitted_at,
        }
    }

    /// Number of CRM calls that failed along the way.
    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| !a.succeeded).count()
    }

    /// Last recorded error, for the log line.
    pub fn last_error(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| a.error.as_deref())
    }
}
