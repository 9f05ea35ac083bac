//! Solar Quote: installer lead-qualification wizard with CRM and team chat
//! delivery.

pub mod chat;
pub mod config;
pub mod crm;
pub mod error;
pub mod pipeline;
pub mod wizard;
