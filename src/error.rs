//! Error types for the quote service.

use crate::wizard::model::ServiceType;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// CRM collaborator errors.
///
/// Transport failures and API rejections are distinct for logging only;
/// the submission pipeline treats both as a failed attempt.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("CRM {operation} transport failure: {reason}")]
    Transport { operation: String, reason: String },

    #[error("CRM {operation} rejected with status {status}: {body}")]
    Rejected {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from CRM {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl CrmError {
    /// Whether the failure happened before the CRM answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Chat notification errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat transport {name} failed to send: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Chat transport {name} rejected the message: {reason}")]
    Rejected { name: String, reason: String },

    #[error("No chat transport configured")]
    NotConfigured,
}

/// Wizard state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Session {0} not found")]
    SessionNotFound(uuid::Uuid),

    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },

    #[error("Field {field} does not apply to {service}")]
    FieldNotApplicable { field: String, service: String },

    #[error("Service type can only be chosen at step 1")]
    ServiceTypeLocked,

    #[error("Add-on {0} must be selected before its count can change")]
    AddOnNotSelected(String),

    #[error("Step {0} is outside the wizard")]
    StepOutOfRange(u8),
}

impl WizardError {
    pub(crate) fn not_applicable(field: &str, service: Option<ServiceType>) -> Self {
        Self::FieldNotApplicable {
            field: field.to_string(),
            service: service
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no service type".to_string()),
        }
    }
}
