//! Step resolver: decides what the visitor sees at a given step.
//!
//! Resolution is a pure function of the step and the answers so far. Steps
//! that have nothing to ask for a branch resolve to [`Resolution::AutoSkip`]
//! and carry the field that must be marked not applicable.

use rust_decimal::Decimal;
use serde::Serialize;

use super::model::{
    AddOnKind, Answers, Choice, ContactField, FieldValue, RoofType, ServiceAnswers, ServiceType,
    SkippedField, Slot,
};
use super::state::WizardStep;

/// Which question a view asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    ServiceType,
    RoofType,
    HybridInverter,
    PhaseConnection,
    HouseAge,
    InverterBrand,
    ExistingEquipment,
    Consumption,
    ContactDetails,
}

/// A selectable answer. `auto_advance` tells the page to follow the answer
/// with an advance, since branch steps have no confirm button.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hint: String,
    pub answer: FieldValue,
    pub selected: bool,
    pub auto_advance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactInput {
    pub field: ContactField,
    pub placeholder: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddOnOption {
    pub kind: AddOnKind,
    pub label: String,
    pub price: Decimal,
    pub selected: bool,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewBody {
    Choice {
        options: Vec<ChoiceOption>,
    },
    ContactForm {
        fields: Vec<ContactInput>,
        add_ons: Vec<AddOnOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Everything the page needs to render one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSpec {
    pub step: WizardStep,
    pub question: Question,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub body: ViewBody,
}

impl ViewSpec {
    pub fn options(&self) -> &[ChoiceOption] {
        match &self.body {
            ViewBody::Choice { options } => options.as_slice(),
            ViewBody::ContactForm { .. } => &[],
        }
    }
}

/// Outcome of resolving a step.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    View(ViewSpec),
    /// Nothing to ask here: mark the field not applicable and move on.
    AutoSkip(SkippedField),
}

/// Resolve the view for `step` given the answers collected so far.
///
/// Combinations without a dedicated question (no service type yet) fall back
/// to the roof-type question.
pub fn resolve_step(step: WizardStep, answers: &Answers) -> Resolution {
    if step == WizardStep::FIRST {
        return Resolution::View(service_type_view(step, answers.service_type()));
    }
    if step.is_last() {
        return Resolution::View(contact_view(step, answers));
    }

    let view = match (step.get(), answers.service.as_ref()) {
        (2, Some(ServiceAnswers::Solar(a) | ServiceAnswers::SolarBattery(a))) => {
            roof_type_view(step, a.roof_type)
        }
        (2, Some(ServiceAnswers::Battery(a))) => hybrid_inverter_view(step, a.hybrid_inverter),
        (2, Some(ServiceAnswers::EvCharger(a))) => choice_view(
            step,
            Question::PhaseConnection,
            "Heeft u een 1 of 3-fasen aansluiting?",
            "Dit bepaalt het type laadpaal dat geschikt is voor uw woning.",
            a.phase.chosen(),
            FieldValue::Phase,
        ),
        (3, Some(ServiceAnswers::Solar(a) | ServiceAnswers::SolarBattery(a))) => choice_view(
            step,
            Question::HouseAge,
            "Hoe oud is uw woning?",
            "Om het correcte BTW tarief te kunnen berekenen.",
            a.house_age.chosen(),
            FieldValue::HouseAge,
        ),
        (3, Some(ServiceAnswers::Battery(a))) => {
            if a.hybrid_inverter.chosen() != Some(&true) {
                return Resolution::AutoSkip(SkippedField::InverterBrand);
            }
            choice_view(
                step,
                Question::InverterBrand,
                "Welke merk omvormer heeft u?",
                "Dit bepaalt welke thuisbatterij compatibel is met uw installatie.",
                a.inverter_brand.chosen(),
                FieldValue::InverterBrand,
            )
        }
        (3, Some(ServiceAnswers::EvCharger(a))) => choice_view(
            step,
            Question::ExistingEquipment,
            "Heeft u reeds zonnepanelen of een thuisbatterij?",
            "Dit helpt bij het bepalen van de optimale laadoplossing.",
            a.existing_equipment.chosen(),
            FieldValue::ExistingEquipment,
        ),
        (4, Some(ServiceAnswers::EvCharger(_))) => {
            return Resolution::AutoSkip(SkippedField::Consumption);
        }
        (4, Some(answers)) => choice_view(
            step,
            Question::Consumption,
            "Wat is uw jaarlijks verbruik?",
            "Selecteer uw gemiddeld jaarlijks energieverbruik.",
            answers.consumption().chosen(),
            FieldValue::Consumption,
        ),
        _ => roof_type_view(step, Slot::Empty),
    };
    Resolution::View(view)
}

fn choice_view<T: Choice>(
    step: WizardStep,
    question: Question,
    title: &str,
    description: &str,
    current: Option<&T>,
    answer: fn(T) -> FieldValue,
) -> ViewSpec {
    let options = T::ALL
        .iter()
        .map(|choice| ChoiceOption {
            label: choice.label().to_string(),
            hint: choice.hint().to_string(),
            answer: answer(*choice),
            selected: current == Some(choice),
            auto_advance: true,
        })
        .collect();

    ViewSpec {
        step,
        question,
        title: format!("{step}. {title}"),
        description: description.to_string(),
        body: ViewBody::Choice { options },
    }
}

fn service_type_view(step: WizardStep, current: Option<ServiceType>) -> ViewSpec {
    choice_view(
        step,
        Question::ServiceType,
        "Naar wat bent u op zoek?",
        "Selecteer het type installatie dat u zoekt.",
        current.as_ref(),
        FieldValue::ServiceType,
    )
}

fn roof_type_view(step: WizardStep, current: Slot<RoofType>) -> ViewSpec {
    choice_view(
        step,
        Question::RoofType,
        "Wat voor type dak heeft u?",
        "Het type dak beïnvloedt de installatiemethode.",
        current.chosen(),
        FieldValue::RoofType,
    )
}

fn hybrid_inverter_view(step: WizardStep, current: Slot<bool>) -> ViewSpec {
    let option = |has: bool, label: &str, hint: &str| ChoiceOption {
        label: label.to_string(),
        hint: hint.to_string(),
        answer: FieldValue::HybridInverter(has),
        selected: current.chosen() == Some(&has),
        auto_advance: true,
    };

    ViewSpec {
        step,
        question: Question::HybridInverter,
        title: format!("{step}. Heeft u reeds een hybride omvormer?"),
        description: "Een hybride omvormer is nodig voor een thuisbatterij.".to_string(),
        body: ViewBody::Choice {
            options: vec![
                option(true, "Ja", "Ik heb al een hybride omvormer"),
                option(false, "Nee", "Ik heb nog geen hybride omvormer"),
            ],
        },
    }
}

pub(crate) fn contact_view(step: WizardStep, answers: &Answers) -> ViewSpec {
    let fields = ContactField::ALL
        .into_iter()
        .map(|field| ContactInput {
            field,
            placeholder: field.placeholder().to_string(),
            value: answers.contact.get(field).to_string(),
        })
        .collect();

    let add_ons = answers
        .add_ons
        .iter()
        .map(|(kind, entry)| AddOnOption {
            kind,
            label: kind.label().to_string(),
            price: entry.price,
            selected: entry.selected,
            count: entry.count,
        })
        .collect();

    ViewSpec {
        step,
        question: Question::ContactDetails,
        title: format!("{step}. Uw Gegevens"),
        description: "Nodig om uw offerte aan te vragen.".to_string(),
        body: ViewBody::ContactForm {
            fields,
            add_ons,
            error: None,
        },
    }
}
