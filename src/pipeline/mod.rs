//! Lead submission pipeline.
//!
//! A finished wizard run becomes a [`LeadRecord`] and flows through:
//! 1. CRM contact creation (fatal on failure)
//! 2. Deal creation via [`DealStrategy`] fallbacks
//! 3. Description delivery via [`DescriptionStrategy`] fallbacks
//! 4. Team chat notification (never fatal)

pub mod description;
pub mod submit;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use submit::SubmissionPipeline;
pub use types::{
    DealStrategy, DescriptionDelivery, DescriptionStrategy, LeadRecord, LeadSource,
    SubmissionOutcome,
};
