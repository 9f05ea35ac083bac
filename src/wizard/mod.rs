//! Five-step quote wizard: answers, step resolution, per-visitor state
//! machine, sessions and HTTP routes.

pub mod controller;
pub mod model;
pub mod resolver;
pub mod routes;
pub mod sessions;
pub mod state;

pub use controller::{SubmitStatus, WizardController, WizardView};
pub use model::{Answers, FieldValue, ServiceType};
pub use resolver::{Resolution, ViewSpec, resolve_step};
pub use routes::{QuoteRouteState, quote_routes};
pub use sessions::SessionStore;
pub use state::{SubmissionState, WizardPhase, WizardStep};
