//! Wizard state machine: step position and submission phase.

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// Position inside the question flow, always within `1..=WizardStep::LAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WizardStep(u8);

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep(1);
    /// The contact form.
    pub const LAST: WizardStep = WizardStep(5);

    pub fn new(step: u8) -> Result<Self, WizardError> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&step) {
            Ok(Self(step))
        } else {
            Err(WizardError::StepOutOfRange(step))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The following step, if any.
    pub fn next(self) -> Option<WizardStep> {
        (self < Self::LAST).then(|| Self(self.0 + 1))
    }

    /// The preceding step, if any.
    pub fn prev(self) -> Option<WizardStep> {
        (self > Self::FIRST).then(|| Self(self.0 - 1))
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = WizardError;

    fn try_from(step: u8) -> Result<Self, Self::Error> {
        Self::new(step)
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.0
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The phases of one wizard session.
///
/// `Step(1)` → … → `Step(5)` → `Submitting` → `Succeeded` | `Failed`.
/// Terminal phases return to `Step(1)` through a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardPhase {
    Step { step: WizardStep },
    Submitting,
    Succeeded { deal_id: u64 },
    Failed { message: String },
}

impl WizardPhase {
    pub fn step(&self) -> Option<WizardStep> {
        match self {
            Self::Step { step } => Some(*step),
            _ => None,
        }
    }

    /// Whether the submission has settled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

impl Default for WizardPhase {
    fn default() -> Self {
        Self::Step {
            step: WizardStep::FIRST,
        }
    }
}

impl std::fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step { step } => write!(f, "at step {step}"),
            Self::Submitting => write!(f, "submitting"),
            Self::Succeeded { .. } => write!(f, "succeeded"),
            Self::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Submission status as reported to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded { deal_id: u64 },
    Failed { message: String },
}

impl From<&WizardPhase> for SubmissionState {
    fn from(phase: &WizardPhase) -> Self {
        match phase {
            WizardPhase::Step { .. } => Self::Idle,
            WizardPhase::Submitting => Self::Submitting,
            WizardPhase::Succeeded { deal_id } => Self::Succeeded { deal_id: *deal_id },
            WizardPhase::Failed { message } => Self::Failed {
                message: message.clone(),
            },
        }
    }
}
