//! CRM collaborator: contact and deal records for incoming leads.

pub mod pipedrive;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::CrmError;

pub use pipedrive::{PipedriveClient, PipedriveConfig};

pub type ContactId = u64;
pub type DealId = u64;

/// A person to create in the CRM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address_note: Option<String>,
}

/// A deal linked to a contact. Optional fields are left out of the request
/// entirely when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeal {
    pub contact_id: ContactId,
    pub title: String,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub currency: Option<String>,
}

impl NewDeal {
    /// Title and contact link only.
    pub fn minimal(contact_id: ContactId, title: impl Into<String>) -> Self {
        Self {
            contact_id,
            title: title.into(),
            description: None,
            value: None,
            currency: None,
        }
    }
}

/// Fields to change on an existing deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealUpdate {
    pub description: String,
}

/// Remote contact/deal tracking system.
///
/// Every call may fail with a transport error or an API rejection.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn create_contact(&self, contact: &NewContact) -> Result<ContactId, CrmError>;

    async fn create_deal(&self, deal: &NewDeal) -> Result<DealId, CrmError>;

    async fn update_deal(&self, deal_id: DealId, update: &DealUpdate) -> Result<(), CrmError>;

    async fn add_note(&self, deal_id: DealId, text: &str) -> Result<(), CrmError>;
}
