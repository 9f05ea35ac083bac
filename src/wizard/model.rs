//! Answer set collected by the quote wizard.
//!
//! Each service type owns its own strongly-typed answers, so a roof type can
//! never be read as a phase count. Labels are the customer-facing copy used
//! on the landing page and in the lead summaries sent to the sales team.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// Upper bound for the quantity of a single add-on.
pub const MAX_ADD_ON_COUNT: u32 = 10;

/// A closed set of answers that can be offered as buttons.
pub trait Choice: Copy + PartialEq + Sized + 'static {
    /// Every variant, in the order the options are presented.
    const ALL: &'static [Self];

    /// Main button text.
    fn label(&self) -> &'static str;

    /// Secondary line under the label.
    fn hint(&self) -> &'static str {
        ""
    }
}

// ── Service type ────────────────────────────────────────────────────────

/// What the visitor is looking for. Chosen at step 1; drives every later step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    SolarBattery,
    Solar,
    Battery,
    EvCharger,
}

impl Choice for ServiceType {
    const ALL: &'static [Self] = &[
        Self::SolarBattery,
        Self::Solar,
        Self::Battery,
        Self::EvCharger,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::SolarBattery => "Zonnepanelen & Batterijopslag",
            Self::Solar => "Zonnepanelen",
            Self::Battery => "Batterijopslag",
            Self::EvCharger => "Laadpaal",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::SolarBattery => "Complete oplossing voor energiebesparing",
            Self::Solar => "Complete installatie van zonnepanelen",
            Self::Battery => "Opslag van uw zelf opgewekte energie",
            Self::EvCharger => "Elektrische auto thuis opladen",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SolarBattery => "solar_battery",
            Self::Solar => "solar",
            Self::Battery => "battery",
            Self::EvCharger => "ev_charger",
        };
        write!(f, "{s}")
    }
}

// ── Branch answer enums ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofType {
    Pitched,
    Flat,
}

impl Choice for RoofType {
    const ALL: &'static [Self] = &[Self::Pitched, Self::Flat];

    fn label(&self) -> &'static str {
        match self {
            Self::Pitched => "Hellend dak",
            Self::Flat => "Plat dak",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::Pitched => "Schuin dak met dakpannen",
            Self::Flat => "Vlakke dakbedekking",
        }
    }
}

/// House age decides the VAT rate on the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseAge {
    OlderThanTenYears,
    NewerThanTenYears,
}

impl Choice for HouseAge {
    const ALL: &'static [Self] = &[Self::OlderThanTenYears, Self::NewerThanTenYears];

    fn label(&self) -> &'static str {
        match self {
            Self::OlderThanTenYears => "Ouder dan 10 jaar",
            Self::NewerThanTenYears => "Jonger dan 10 jaar",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::OlderThanTenYears => "Gebouwd vóór 2014",
            Self::NewerThanTenYears => "Gebouwd na 2014",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverterBrand {
    Sma,
    Fronius,
    Huawei,
    Goodwe,
    SolarEdge,
    Other,
}

impl Choice for InverterBrand {
    const ALL: &'static [Self] = &[
        Self::Sma,
        Self::Fronius,
        Self::Huawei,
        Self::Goodwe,
        Self::SolarEdge,
        Self::Other,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::Sma => "SMA",
            Self::Fronius => "Fronius",
            Self::Huawei => "Huawei",
            Self::Goodwe => "Goodwe",
            Self::SolarEdge => "SolarEdge",
            Self::Other => "Ik weet het niet/Andere",
        }
    }
}

/// Yearly household electricity consumption bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consumption {
    Low,
    Average,
    High,
    VeryHigh,
}

impl Choice for Consumption {
    const ALL: &'static [Self] = &[
        Self::Low,
        Self::Average,
        Self::High,
        Self::VeryHigh,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::Low => "2000-3000 kWh",
            Self::Average => "3000-4000 kWh",
            Self::High => "4000-6000 kWh",
            Self::VeryHigh => "6000 kWh of meer",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::Low => "Klein huishouden (1-2 personen)",
            Self::Average => "Gemiddeld huishouden (2-3 personen)",
            Self::High => "Groot huishouden (3-4 personen)",
            Self::VeryHigh => "Groot verbruik (laadpaal, warmtepomp, zwembad..)",
        }
    }
}

/// Grid connection of the house, relevant for EV charger sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseConnection {
    Single,
    Three,
    Unknown,
}

impl Choice for PhaseConnection {
    const ALL: &'static [Self] = &[Self::Single, Self::Three, Self::Unknown];

    fn label(&self) -> &'static str {
        match self {
            Self::Single => "1-fase",
            Self::Three => "3-fase",
            Self::Unknown => "Ik weet het niet",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::Single => "Standaard huisaansluiting",
            Self::Three => "Krachtstroom aansluiting",
            Self::Unknown => "We helpen u dit te bepalen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingEquipment {
    SolarPanels,
    HomeBattery,
    Both,
    Neither,
}

impl Choice for ExistingEquipment {
    const ALL: &'static [Self] = &[
        Self::SolarPanels,
        Self::HomeBattery,
        Self::Both,
        Self::Neither,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::SolarPanels => "Zonnepanelen",
            Self::HomeBattery => "Thuisbatterij",
            Self::Both => "Beide",
            Self::Neither => "Geen van beide",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::SolarPanels => "Ik heb al zonnepanelen",
            Self::HomeBattery => "Ik heb een thuisbatterij",
            Self::Both => "Ik heb zonnepanelen en een thuisbatterij",
            Self::Neither => "Ik heb geen zonnepanelen of thuisbatterij",
        }
    }
}

// ── Slots ───────────────────────────────────────────────────────────────

/// A single answer cell.
///
/// `NotApplicable` is written by steps that are skipped for a branch, so a
/// summary can tell "not asked" apart from "not answered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot<T> {
    Empty,
    Chosen(T),
    NotApplicable,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> Slot<T> {
    pub fn chosen(&self) -> Option<&T> {
        match self {
            Self::Chosen(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ── Branch answers ──────────────────────────────────────────────────────

/// Answers for the solar and solar + battery branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarAnswers {
    pub roof_type: Slot<RoofType>,
    pub house_age: Slot<HouseAge>,
    pub consumption: Slot<Consumption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryAnswers {
    pub hybrid_inverter: Slot<bool>,
    /// Only asked when a hybrid inverter is already installed.
    pub inverter_brand: Slot<InverterBrand>,
    pub consumption: Slot<Consumption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvChargerAnswers {
    pub phase: Slot<PhaseConnection>,
    pub existing_equipment: Slot<ExistingEquipment>,
    /// Never asked for EV chargers; set to `NotApplicable` when step 4 is skipped.
    pub consumption: Slot<Consumption>,
}

/// Branch-specific answers, tagged by service type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service_type", rename_all = "snake_case")]
pub enum ServiceAnswers {
    SolarBattery(SolarAnswers),
    Solar(SolarAnswers),
    Battery(BatteryAnswers),
    EvCharger(EvChargerAnswers),
}

impl ServiceAnswers {
    /// Fresh, unanswered branch for a service type.
    pub fn new(service: ServiceType) -> Self {
        match service {
            ServiceType::SolarBattery => Self::SolarBattery(SolarAnswers::default()),
            ServiceType::Solar => Self::Solar(SolarAnswers::default()),
            ServiceType::Battery => Self::Battery(BatteryAnswers::default()),
            ServiceType::EvCharger => Self::EvCharger(EvChargerAnswers::default()),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::SolarBattery(_) => ServiceType::SolarBattery,
            Self::Solar(_) => ServiceType::Solar,
            Self::Battery(_) => ServiceType::Battery,
            Self::EvCharger(_) => ServiceType::EvCharger,
        }
    }

    pub fn consumption(&self) -> Slot<Consumption> {
        match self {
            Self::SolarBattery(a) | Self::Solar(a) => a.consumption,
            Self::Battery(a) => a.consumption,
            Self::EvCharger(a) => a.consumption,
        }
    }

    /// Write a branch field. Returns false when the field does not belong
    /// to this branch.
    fn apply(&mut self, value: FieldValue) -> bool {
        match (self, value) {
            (Self::Solar(a) | Self::SolarBattery(a), FieldValue::RoofType(roof)) => {
                a.roof_type = Slot::Chosen(roof)
            }
            (Self::Solar(a) | Self::SolarBattery(a), FieldValue::HouseAge(age)) => {
                a.house_age = Slot::Chosen(age)
            }
            (Self::Solar(a) | Self::SolarBattery(a), FieldValue::Consumption(consumption)) => {
                a.consumption = Slot::Chosen(consumption)
            }
            (Self::Battery(a), FieldValue::HybridInverter(has)) => {
                if a.hybrid_inverter.chosen() != Some(&has) {
                    // The brand question only exists with an inverter.
                    a.inverter_brand = Slot::Empty;
                }
                a.hybrid_inverter = Slot::Chosen(has);
            }
            (Self::Battery(a), FieldValue::InverterBrand(brand))
                if a.hybrid_inverter.chosen() == Some(&true) =>
            {
                a.inverter_brand = Slot::Chosen(brand)
            }
            (Self::Battery(a), FieldValue::Consumption(consumption)) => {
                a.consumption = Slot::Chosen(consumption)
            }
            (Self::EvCharger(a), FieldValue::Phase(phase)) => a.phase = Slot::Chosen(phase),
            (Self::EvCharger(a), FieldValue::ExistingEquipment(existing)) => {
                a.existing_equipment = Slot::Chosen(existing)
            }
            _ => return false,
        }
        true
    }

    fn consumption_mut(&mut self) -> &mut Slot<Consumption> {
        match self {
            Self::SolarBattery(a) | Self::Solar(a) => &mut a.consumption,
            Self::Battery(a) => &mut a.consumption,
            Self::EvCharger(a) => &mut a.consumption,
        }
    }
}

// ── Add-ons ─────────────────────────────────────────────────────────────

/// Optional extras offered next to the main installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnKind {
    EmsSystem,
    EvCharger,
    BackupSupply,
    HeatPump,
}

impl AddOnKind {
    pub const ALL: [AddOnKind; 4] = [
        Self::EmsSystem,
        Self::EvCharger,
        Self::BackupSupply,
        Self::HeatPump,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::EmsSystem => "EMS Systeem (Slimme sturing)",
            Self::EvCharger => "Laadpaal",
            Self::BackupSupply => "Back-up voorziening",
            Self::HeatPump => "Airco / warmtepomp",
        }
    }

    /// Indicative list price in euro.
    pub fn price(&self) -> Decimal {
        match self {
            Self::EmsSystem => dec!(850),
            Self::EvCharger => dec!(1350),
            Self::BackupSupply => dec!(750),
            Self::HeatPump => dec!(1500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnEntry {
    pub selected: bool,
    pub count: u32,
    pub price: Decimal,
}

/// The add-on catalog. Keys are fixed at construction; only `selected` and
/// `count` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOns(BTreeMap<AddOnKind, AddOnEntry>);

impl Default for AddOns {
    fn default() -> Self {
        Self(
            AddOnKind::ALL
                .iter()
                .map(|kind| {
                    (
                        *kind,
                        AddOnEntry {
                            selected: false,
                            count: 0,
                            price: kind.price(),
                        },
                    )
                })
                .collect(),
        )
    }
}

impl AddOns {
    pub fn get(&self, kind: AddOnKind) -> Option<&AddOnEntry> {
        self.0.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AddOnKind, &AddOnEntry)> {
        self.0.iter().map(|(kind, entry)| (*kind, entry))
    }

    /// Selected add-ons in catalog order.
    pub fn selected(&self) -> impl Iterator<Item = (AddOnKind, &AddOnEntry)> {
        self.iter().filter(|(_, entry)| entry.selected)
    }

    /// Select or deselect an add-on. Selecting starts at a count of one,
    /// deselecting drops the count to zero.
    pub fn set_selected(&mut self, kind: AddOnKind, selected: bool) {
        let entry = self.0.entry(kind).or_insert_with(|| AddOnEntry {
            selected: false,
            count: 0,
            price: kind.price(),
        });
        entry.selected = selected;
        entry.count = if selected { entry.count.max(1) } else { 0 };
    }

    /// Change the quantity of a selected add-on, clamped to `1..=MAX_ADD_ON_COUNT`.
    pub fn set_count(&mut self, kind: AddOnKind, count: u32) -> Result<u32, WizardError> {
        match self.0.get_mut(&kind) {
            Some(entry) if entry.selected => {
                entry.count = count.clamp(1, MAX_ADD_ON_COUNT);
                Ok(entry.count)
            }
            _ => Err(WizardError::AddOnNotSelected(kind.label().to_string())),
        }
    }
}

// ── Contact ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Phone,
    Email,
    Address,
}

impl ContactField {
    pub const ALL: [ContactField; 4] = [Self::Name, Self::Phone, Self::Email, Self::Address];

    /// Placeholder shown in the input.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Name => "Volledige Naam",
            Self::Phone => "Telefoonnummer",
            Self::Email => "E-mailadres",
            Self::Address => "Adres",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl Contact {
    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Phone => &self.phone,
            ContactField::Email => &self.email,
            ContactField::Address => &self.address,
        }
    }

    /// Fields that are blank once surrounding whitespace is ignored.
    pub fn missing_fields(&self) -> Vec<ContactField> {
        ContactField::ALL
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }
}

// ── Field updates ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnToggle {
    pub kind: AddOnKind,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnQuantity {
    pub kind: AddOnKind,
    pub count: u32,
}

/// One write into the answer set, e.g. `{"field": "roof_type", "value": "flat"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    ServiceType(ServiceType),
    RoofType(RoofType),
    HouseAge(HouseAge),
    HybridInverter(bool),
    InverterBrand(InverterBrand),
    Consumption(Consumption),
    Phase(PhaseConnection),
    ExistingEquipment(ExistingEquipment),
    AddOn(AddOnToggle),
    AddOnCount(AddOnQuantity),
    ContactName(String),
    ContactPhone(String),
    ContactEmail(String),
    ContactAddress(String),
}

impl FieldValue {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ServiceType(_) => "service_type",
            Self::RoofType(_) => "roof_type",
            Self::HouseAge(_) => "house_age",
            Self::HybridInverter(_) => "hybrid_inverter",
            Self::InverterBrand(_) => "inverter_brand",
            Self::Consumption(_) => "consumption",
            Self::Phase(_) => "phase",
            Self::ExistingEquipment(_) => "existing_equipment",
            Self::AddOn(_) => "add_on",
            Self::AddOnCount(_) => "add_on_count",
            Self::ContactName(_) => "contact_name",
            Self::ContactPhone(_) => "contact_phone",
            Self::ContactEmail(_) => "contact_email",
            Self::ContactAddress(_) => "contact_address",
        }
    }
}

/// A field filled with `NotApplicable` when its step is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedField {
    InverterBrand,
    Consumption,
}

// ── Answers ─────────────────────────────────────────────────────────────

/// Everything the visitor has told the wizard during one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    pub service: Option<ServiceAnswers>,
    pub add_ons: AddOns,
    pub contact: Contact,
}

impl Answers {
    pub fn service_type(&self) -> Option<ServiceType> {
        self.service.as_ref().map(ServiceAnswers::service_type)
    }

    /// Write one field.
    ///
    /// Choosing the same service type again keeps the branch answers; a
    /// different one starts the branch over. Branch fields written while
    /// another branch is active are rejected.
    pub fn apply(&mut self, value: FieldValue) -> Result<(), WizardError> {
        let field = value.field_name();
        let service = self.service_type();
        let not_applicable = || WizardError::not_applicable(field, service);

        match value {
            FieldValue::ServiceType(chosen) => {
                if service != Some(chosen) {
                    self.service = Some(ServiceAnswers::new(chosen));
                }
            }
            FieldValue::AddOn(toggle) => self.add_ons.set_selected(toggle.kind, toggle.selected),
            FieldValue::AddOnCount(quantity) => {
                self.add_ons.set_count(quantity.kind, quantity.count)?;
            }
            FieldValue::ContactName(v) => self.contact.name = v,
            FieldValue::ContactPhone(v) => self.contact.phone = v,
            FieldValue::ContactEmail(v) => self.contact.email = v,
            FieldValue::ContactAddress(v) => self.contact.address = v,
            branch_field => {
                let answers = self.service.as_mut().ok_or_else(not_applicable)?;
                if !answers.apply(branch_field) {
                    return Err(not_applicable());
                }
            }
        }
        Ok(())
    }

    /// Record that a step was skipped for the active branch.
    pub fn mark_not_applicable(&mut self, field: SkippedField) {
        match (field, self.service.as_mut()) {
            (SkippedField::InverterBrand, Some(ServiceAnswers::Battery(a))) => {
                a.inverter_brand = Slot::NotApplicable;
            }
            (SkippedField::Consumption, Some(answers)) => {
                *answers.consumption_mut() = Slot::NotApplicable;
            }
            _ => {}
        }
    }
}
