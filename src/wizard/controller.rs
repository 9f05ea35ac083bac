//! Per-visitor wizard controller: answers plus the step/submit state machine.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::model::{Answers, FieldValue};
use super::resolver::{Resolution, ViewBody, ViewSpec, contact_view, resolve_step};
use super::state::{SubmissionState, WizardPhase, WizardStep};
use crate::error::WizardError;
use crate::pipeline::{LeadRecord, LeadSource, SubmissionOutcome, SubmissionPipeline};

/// Shown under the contact form when a field is blank.
pub const VALIDATION_MESSAGE: &str = "Vul alstublieft alle gegevens in.";

/// Shown after a failed submission. Details stay in the log.
pub const SUBMIT_FAILED_MESSAGE: &str = "Er is een fout opgetreden. Probeer het opnieuw.";

pub const THANK_YOU_MESSAGE: &str =
    "Bedankt voor uw aanvraag. Een van onze adviseurs neemt binnen 24 uur contact met u op.";

/// What the page should render right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WizardView {
    Step(ViewSpec),
    Submitting,
    Succeeded { message: String },
    Failed { message: String },
}

impl WizardView {
    /// The question view, when the wizard is on a step.
    pub fn spec(&self) -> Option<&ViewSpec> {
        match self {
            Self::Step(view) => Some(view),
            _ => None,
        }
    }
}

/// Result of a submit request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitStatus {
    /// Contact details incomplete; still on the contact form.
    Rejected { message: String },
    /// A submission is already in flight; nothing was sent.
    AlreadySubmitting,
    Completed { outcome: SubmissionOutcome },
}

#[derive(Debug, Clone, Default)]
struct Session {
    phase: WizardPhase,
    answers: Answers,
    validation_error: Option<String>,
}

impl Session {
    fn require_step(&self, action: &str) -> Result<WizardStep, WizardError> {
        self.phase.step().ok_or_else(|| WizardError::InvalidTransition {
            action: action.to_string(),
            state: self.phase.to_string(),
        })
    }

    /// First step from `step` onwards that asks something, marking the
    /// field of every step passed over. Stops on the contact form.
    fn skip_from(&mut self, mut step: WizardStep) -> WizardStep {
        while let Resolution::AutoSkip(field) = resolve_step(step, &self.answers) {
            debug!(step = %step, field = ?field, "Auto-skipping step");
            self.answers.mark_not_applicable(field);
            match step.next() {
                Some(after) => step = after,
                None => break,
            }
        }
        step
    }

    /// Re-apply skip rules after an answer changed which questions exist.
    /// Passed steps that lost their question get their field marked, and
    /// the current step moves on when its own question disappeared.
    fn settle(&mut self, current: WizardStep) {
        let mut step = WizardStep::FIRST;
        while step < current {
            if let Resolution::AutoSkip(field) = resolve_step(step, &self.answers) {
                self.answers.mark_not_applicable(field);
            }
            match step.next() {
                Some(after) => step = after,
                None => break,
            }
        }
        let step = self.skip_from(current);
        self.phase = WizardPhase::Step { step };
    }

    fn view(&self) -> WizardView {
        match &self.phase {
            WizardPhase::Step { step } => {
                let mut view = visible_view(*step, &self.answers);
                if let ViewBody::ContactForm { error, .. } = &mut view.body {
                    error.clone_from(&self.validation_error);
                }
                WizardView::Step(view)
            }
            WizardPhase::Submitting => WizardView::Submitting,
            WizardPhase::Succeeded { .. } => WizardView::Succeeded {
                message: THANK_YOU_MESSAGE.to_string(),
            },
            WizardPhase::Failed { message } => WizardView::Failed {
                message: message.clone(),
            },
        }
    }
}

/// The view at `step`, or the first one after it when `step` has nothing
/// to ask. The contact form always resolves to a view.
fn visible_view(mut step: WizardStep, answers: &Answers) -> ViewSpec {
    loop {
        match (resolve_step(step, answers), step.next()) {
            (Resolution::View(view), _) => return view,
            (Resolution::AutoSkip(_), Some(next)) => step = next,
            (Resolution::AutoSkip(_), None) => return contact_view(step, answers),
        }
    }
}

/// One visitor's wizard.
///
/// The lock is released while the submission pipeline runs; the
/// `Submitting` phase, set under the write lock, guards against a second
/// submission.
pub struct WizardController {
    session: RwLock<Session>,
    pipeline: Arc<SubmissionPipeline>,
    source: LeadSource,
}

impl WizardController {
    pub fn new(pipeline: Arc<SubmissionPipeline>, source: LeadSource) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            pipeline,
            source,
        }
    }

    pub async fn current_view(&self) -> WizardView {
        self.session.read().await.view()
    }

    pub async fn submission_state(&self) -> SubmissionState {
        SubmissionState::from(&self.session.read().await.phase)
    }

    pub async fn answers(&self) -> Answers {
        self.session.read().await.answers.clone()
    }

    /// Record one answer without moving. The page decides whether to follow
    /// up with [`advance`](Self::advance).
    pub async fn submit_answer(&self, value: FieldValue) -> Result<WizardView, WizardError> {
        let mut session = self.session.write().await;
        let step = session.require_step("answer")?;

        if matches!(value, FieldValue::ServiceType(_)) && step != WizardStep::FIRST {
            return Err(WizardError::ServiceTypeLocked);
        }

        debug!(step = %step, field = value.field_name(), "Answer recorded");
        session.answers.apply(value)?;
        session.settle(step);
        session.validation_error = None;
        Ok(session.view())
    }

    /// Move to the next step that has a question, marking skipped fields
    /// as not applicable. A no-op on the contact form.
    pub async fn advance(&self) -> Result<WizardView, WizardError> {
        let mut session = self.session.write().await;
        let step = session.require_step("advance")?;

        let Some(next) = step.next() else {
            return Ok(session.view());
        };
        let next = session.skip_from(next);

        session.phase = WizardPhase::Step { step: next };
        session.validation_error = None;
        Ok(session.view())
    }

    /// Move to the previous step that has a question. A no-op at step 1.
    pub async fn retreat(&self) -> Result<WizardView, WizardError> {
        let mut session = self.session.write().await;
        let step = session.require_step("go back")?;

        let Some(mut prev) = step.prev() else {
            return Ok(session.view());
        };
        while let Resolution::AutoSkip(_) = resolve_step(prev, &session.answers) {
            match prev.prev() {
                Some(before) => prev = before,
                None => break,
            }
        }

        session.phase = WizardPhase::Step { step: prev };
        session.validation_error = None;
        Ok(session.view())
    }

    /// Validate the contact details and run the submission pipeline once.
    pub async fn submit(&self) -> Result<SubmitStatus, WizardError> {
        let lead = {
            let mut session = self.session.write().await;
            match &session.phase {
                WizardPhase::Submitting => {
                    debug!("Submit ignored: submission already in flight");
                    return Ok(SubmitStatus::AlreadySubmitting);
                }
                WizardPhase::Step { step } if step.is_last() => {}
                other => {
                    return Err(WizardError::InvalidTransition {
                        action: "submit".to_string(),
                        state: other.to_string(),
                    });
                }
            }

            let missing = session.answers.contact.missing_fields();
            if !missing.is_empty() {
                info!(missing = ?missing, "Submission rejected: contact details incomplete");
                session.validation_error = Some(VALIDATION_MESSAGE.to_string());
                return Ok(SubmitStatus::Rejected {
                    message: VALIDATION_MESSAGE.to_string(),
                });
            }

            session.validation_error = None;
            session.phase = WizardPhase::Submitting;
            LeadRecord::from_answers(&session.answers, &self.source)
        };

        let outcome = self.pipeline.submit(&lead).await;

        let mut session = self.session.write().await;
        session.phase = match (outcome.success, outcome.deal_id) {
            (true, Some(deal_id)) => WizardPhase::Succeeded { deal_id },
            _ => {
                warn!(
                    error = outcome.last_error().unwrap_or("unknown"),
                    "Lead submission failed"
                );
                WizardPhase::Failed {
                    message: SUBMIT_FAILED_MESSAGE.to_string(),
                }
            }
        };
        Ok(SubmitStatus::Completed { outcome })
    }

    /// Start over with blank answers after a finished submission.
    pub async fn reset(&self) -> Result<WizardView, WizardError> {
        let mut session = self.session.write().await;
        if !session.phase.is_terminal() {
            return Err(WizardError::InvalidTransition {
                action: "reset".to_string(),
                state: session.phase.to_string(),
            });
        }
        *session = Session::default();
        Ok(session.view())
    }

    /// Return to the contact form after a failed submission, answers intact.
    pub async fn resume(&self) -> Result<WizardView, WizardError> {
        let mut session = self.session.write().await;
        if !matches!(session.phase, WizardPhase::Failed { .. }) {
            return Err(WizardError::InvalidTransition {
                action: "resume".to_string(),
                state: session.phase.to_string(),
            });
        }
        session.phase = WizardPhase::Step {
            step: WizardStep::LAST,
        };
        Ok(session.view())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Notify;

    use super::*;
    use crate::chat::ChatNotifier;
    use crate::pipeline::test_support::{RecordingChat, RecordingCrm};
    use crate::wizard::model::{Choice, Consumption, ServiceAnswers, ServiceType, Slot};
    use crate::wizard::resolver::Question;

    fn controller(crm: Arc<RecordingCrm>) -> Arc<WizardController> {
        let chat = ChatNotifier::new(vec![RecordingChat::new(true)]);
        let pipeline = Arc::new(SubmissionPipeline::new(crm, chat));
        Arc::new(WizardController::new(pipeline, LeadSource::default()))
    }

    async fn step_of(wizard: &WizardController) -> u8 {
        match wizard.current_view().await {
            WizardView::Step(view) => view.step.get(),
            other => panic!("expected a step view, got {other:?}"),
        }
    }

    async fn fill_contact(wizard: &WizardController) {
        for value in [
            FieldValue::ContactName("Jan Peeters".to_string()),
            FieldValue::ContactPhone("0471 23 45 67".to_string()),
            FieldValue::ContactEmail("jan@example.be".to_string()),
            FieldValue::ContactAddress("Kerkstraat 1, 9000 Gent".to_string()),
        ] {
            wizard.submit_answer(value).await.unwrap();
        }
    }

    async fn walk_to_contact_form(wizard: &WizardController, service: ServiceType) {
        wizard
            .submit_answer(FieldValue::ServiceType(service))
            .await
            .unwrap();
        let mut advances = 0;
        while step_of(wizard).await < WizardStep::LAST.get() {
            let view = wizard.current_view().await;
            let first = view.spec().unwrap().options()[0].answer.clone();
            if advances > 0 {
                wizard.submit_answer(first).await.unwrap();
            }
            wizard.advance().await.unwrap();
            advances += 1;
            assert!(advances <= 5);
        }
    }

    #[tokio::test]
    async fn first_option_walk_reaches_contact_form_for_every_service() {
        for service in ServiceType::ALL {
            let wizard = controller(Arc::new(RecordingCrm::default()));
            wizard
                .submit_answer(FieldValue::ServiceType(*service))
                .await
                .unwrap();

            let mut advances = 0;
            loop {
                let view = wizard.current_view().await;
                let spec = view.spec().unwrap();
                assert!((1..=5).contains(&spec.step.get()));
                if spec.step.is_last() {
                    break;
                }
                if spec.question != Question::ServiceType {
                    let first = spec.options()[0].answer.clone();
                    wizard.submit_answer(first).await.unwrap();
                }
                wizard.advance().await.unwrap();
                advances += 1;
            }
            assert!(advances <= 5, "{service}: {advances} advances");
        }
    }

    #[tokio::test]
    async fn advance_is_noop_on_contact_form() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        walk_to_contact_form(&wizard, ServiceType::Solar).await;
        wizard.advance().await.unwrap();
        assert_eq!(step_of(&wizard).await, 5);
    }

    #[tokio::test]
    async fn battery_without_inverter_skips_brand_question() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        wizard
            .submit_answer(FieldValue::ServiceType(ServiceType::Battery))
            .await
            .unwrap();
        wizard.advance().await.unwrap();
        wizard
            .submit_answer(FieldValue::HybridInverter(false))
            .await
            .unwrap();

        let view = wizard.advance().await.unwrap();
        let spec = view.spec().unwrap();
        assert_eq!(spec.step.get(), 4);
        assert_eq!(spec.question, Question::Consumption);

        let Some(ServiceAnswers::Battery(battery)) = wizard.answers().await.service else {
            panic!("expected battery answers");
        };
        assert_eq!(battery.inverter_brand, Slot::NotApplicable);

        // Going back never lands on the skipped step.
        assert_eq!(step_of(&wizard).await, 4);
        wizard.retreat().await.unwrap();
        assert_eq!(step_of(&wizard).await, 2);
    }

    #[tokio::test]
    async fn dropping_inverter_on_brand_step_moves_past_it() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        wizard
            .submit_answer(FieldValue::ServiceType(ServiceType::Battery))
            .await
            .unwrap();
        wizard.advance().await.unwrap();
        wizard
            .submit_answer(FieldValue::HybridInverter(true))
            .await
            .unwrap();
        let view = wizard.advance().await.unwrap();
        assert_eq!(view.spec().unwrap().question, Question::InverterBrand);

        let view = wizard
            .submit_answer(FieldValue::HybridInverter(false))
            .await
            .unwrap();
        let spec = view.spec().unwrap();
        assert_eq!(spec.step.get(), 4);
        assert_eq!(spec.question, Question::Consumption);

        let Some(ServiceAnswers::Battery(battery)) = wizard.answers().await.service else {
            panic!("expected battery answers");
        };
        assert_eq!(battery.inverter_brand, Slot::NotApplicable);

        // The consumption question is not asked twice.
        let view = wizard.advance().await.unwrap();
        assert_eq!(view.spec().unwrap().step.get(), 5);
    }

    #[tokio::test]
    async fn dropping_inverter_after_brand_step_marks_brand() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        wizard
            .submit_answer(FieldValue::ServiceType(ServiceType::Battery))
            .await
            .unwrap();
        wizard.advance().await.unwrap();
        wizard
            .submit_answer(FieldValue::HybridInverter(true))
            .await
            .unwrap();
        wizard.advance().await.unwrap();
        let brand = wizard.current_view().await.spec().unwrap().options()[0]
            .answer
            .clone();
        wizard.submit_answer(brand).await.unwrap();
        wizard.advance().await.unwrap();
        assert_eq!(step_of(&wizard).await, 4);

        wizard
            .submit_answer(FieldValue::HybridInverter(false))
            .await
            .unwrap();
        assert_eq!(step_of(&wizard).await, 4);
        let Some(ServiceAnswers::Battery(battery)) = wizard.answers().await.service else {
            panic!("expected battery answers");
        };
        assert_eq!(battery.inverter_brand, Slot::NotApplicable);
    }

    #[tokio::test]
    async fn ev_charger_skips_consumption() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        walk_to_contact_form(&wizard, ServiceType::EvCharger).await;

        let answers = wizard.answers().await;
        assert_eq!(answers.service.unwrap().consumption(), Slot::NotApplicable);

        wizard.retreat().await.unwrap();
        assert_eq!(step_of(&wizard).await, 3);
    }

    #[tokio::test]
    async fn retreat_is_noop_at_first_step() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        wizard.retreat().await.unwrap();
        assert_eq!(step_of(&wizard).await, 1);
    }

    #[tokio::test]
    async fn service_type_only_changes_at_step_one() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        wizard
            .submit_answer(FieldValue::ServiceType(ServiceType::Solar))
            .await
            .unwrap();
        wizard.advance().await.unwrap();

        let err = wizard
            .submit_answer(FieldValue::ServiceType(ServiceType::Battery))
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::ServiceTypeLocked));
    }

    #[tokio::test]
    async fn foreign_field_is_rejected_without_moving() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        walk_to_contact_form(&wizard, ServiceType::EvCharger).await;
        let err = wizard
            .submit_answer(FieldValue::Consumption(Consumption::High))
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::FieldNotApplicable { .. }));
        assert_eq!(step_of(&wizard).await, 5);
    }

    #[tokio::test]
    async fn submit_with_blank_field_stays_on_contact_form() {
        let crm = Arc::new(RecordingCrm::default());
        let wizard = controller(crm.clone());
        walk_to_contact_form(&wizard, ServiceType::Solar).await;
        fill_contact(&wizard).await;
        wizard
            .submit_answer(FieldValue::ContactPhone("   ".to_string()))
            .await
            .unwrap();

        let status = wizard.submit().await.unwrap();
        assert_eq!(
            status,
            SubmitStatus::Rejected {
                message: VALIDATION_MESSAGE.to_string()
            }
        );
        assert_eq!(crm.contact_calls(), 0);

        let view = wizard.current_view().await;
        let Some(ViewBody::ContactForm { error, .. }) = view.spec().map(|v| &v.body) else {
            panic!("expected contact form");
        };
        assert_eq!(error.as_deref(), Some(VALIDATION_MESSAGE));

        // Editing a field clears the message.
        wizard
            .submit_answer(FieldValue::ContactPhone("0471 23 45 67".to_string()))
            .await
            .unwrap();
        let view = wizard.current_view().await;
        let Some(ViewBody::ContactForm { error, .. }) = view.spec().map(|v| &v.body) else {
            panic!("expected contact form");
        };
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn submit_before_contact_form_is_invalid() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        let err = wizard.submit().await.unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn double_submit_runs_pipeline_once() {
        let gate = Arc::new(Notify::new());
        let crm = Arc::new(RecordingCrm {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let wizard = controller(crm.clone());
        walk_to_contact_form(&wizard, ServiceType::Solar).await;
        fill_contact(&wizard).await;

        let first = tokio::spawn({
            let wizard = wizard.clone();
            async move { wizard.submit().await }
        });
        while wizard.submission_state().await != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }
        assert_eq!(wizard.current_view().await, WizardView::Submitting);

        let second = wizard.submit().await.unwrap();
        assert_eq!(second, SubmitStatus::AlreadySubmitting);

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SubmitStatus::Completed { ref outcome } if outcome.success));
        assert_eq!(crm.contact_calls(), 1);
        assert_eq!(
            wizard.submission_state().await,
            SubmissionState::Succeeded { deal_id: 123 }
        );
    }

    #[tokio::test]
    async fn reset_after_success_restores_defaults() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        walk_to_contact_form(&wizard, ServiceType::SolarBattery).await;
        fill_contact(&wizard).await;
        wizard.submit().await.unwrap();
        assert!(matches!(
            wizard.current_view().await,
            WizardView::Succeeded { .. }
        ));

        wizard.reset().await.unwrap();
        assert_eq!(step_of(&wizard).await, 1);
        assert_eq!(wizard.answers().await, Answers::default());
        assert_eq!(wizard.submission_state().await, SubmissionState::Idle);
    }

    #[tokio::test]
    async fn reset_mid_wizard_is_invalid() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        let err = wizard.reset().await.unwrap_err();
        assert!(err.to_string().contains("at step 1"));
    }

    #[tokio::test]
    async fn failed_submission_can_be_resumed() {
        let crm = Arc::new(RecordingCrm {
            fail_contact: true,
            ..Default::default()
        });
        let wizard = controller(crm.clone());
        walk_to_contact_form(&wizard, ServiceType::Battery).await;
        fill_contact(&wizard).await;

        let SubmitStatus::Completed { outcome } = wizard.submit().await.unwrap() else {
            panic!("expected a completed submission");
        };
        assert!(!outcome.success);
        assert_eq!(
            wizard.current_view().await,
            WizardView::Failed {
                message: SUBMIT_FAILED_MESSAGE.to_string()
            }
        );

        wizard.resume().await.unwrap();
        assert_eq!(step_of(&wizard).await, 5);
        assert_eq!(wizard.answers().await.contact.name, "Jan Peeters");
        assert_eq!(
            wizard.answers().await.service.map(|s| s.service_type()),
            Some(ServiceType::Battery)
        );
    }

    #[tokio::test]
    async fn walk_marks_only_branch_skips() {
        let wizard = controller(Arc::new(RecordingCrm::default()));
        walk_to_contact_form(&wizard, ServiceType::Battery).await;
        // First option for the inverter question is "Ja", so the brand is asked.
        let Some(ServiceAnswers::Battery(battery)) = wizard.answers().await.service else {
            panic!("expected battery answers");
        };
        assert_eq!(battery.hybrid_inverter, Slot::Chosen(true));
        assert!(battery.inverter_brand.chosen().is_some());
        assert_ne!(battery.consumption, Slot::NotApplicable);
    }
}
