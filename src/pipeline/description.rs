//! Human-readable renderings of a lead for the CRM and the team channel.
//!
//! Every answer is decoded to its Dutch label. Raw enum names never reach
//! the sales team.

use serde_json::json;

use super::types::LeadRecord;
use crate::chat::ChatMessage;
use crate::wizard::model::{Choice, ServiceAnswers, Slot};

const NOT_ANSWERED: &str = "Niet opgegeven";
const NOT_APPLICABLE: &str = "n.v.t.";
const NO_ADD_ONS: &str = "Geen extra opties geselecteerd";
const UNKNOWN_SERVICE: &str = "Onbekende dienst";

fn slot_text<T: Choice>(slot: &Slot<T>) -> &'static str {
    match slot {
        Slot::Chosen(value) => value.label(),
        Slot::Empty => NOT_ANSWERED,
        Slot::NotApplicable => NOT_APPLICABLE,
    }
}

fn yes_no(slot: &Slot<bool>) -> &'static str {
    match slot {
        Slot::Chosen(true) => "Ja",
        Slot::Chosen(false) => "Nee",
        Slot::Empty => NOT_ANSWERED,
        Slot::NotApplicable => NOT_APPLICABLE,
    }
}

/// Every field the branch collects, in question order, with its decoded value.
pub fn branch_fields(service: &ServiceAnswers) -> Vec<(&'static str, &'static str)> {
    match service {
        ServiceAnswers::Solar(a) | ServiceAnswers::SolarBattery(a) => vec![
            ("Dak type", slot_text(&a.roof_type)),
            ("Woning leeftijd", slot_text(&a.house_age)),
            ("Jaarlijks verbruik", slot_text(&a.consumption)),
        ],
        ServiceAnswers::Battery(a) => vec![
            ("Hybride omvormer", yes_no(&a.hybrid_inverter)),
            ("Merk omvormer", slot_text(&a.inverter_brand)),
            ("Jaarlijks verbruik", slot_text(&a.consumption)),
        ],
        ServiceAnswers::EvCharger(a) => vec![
            ("Aansluiting", slot_text(&a.phase)),
            ("Bestaande installatie", slot_text(&a.existing_equipment)),
            ("Jaarlijks verbruik", slot_text(&a.consumption)),
        ],
    }
}

pub fn service_label(lead: &LeadRecord) -> &'static str {
    lead.service_type()
        .map(|s| s.label())
        .unwrap_or(UNKNOWN_SERVICE)
}

/// `"{service} - {name}"`.
pub fn deal_title(lead: &LeadRecord) -> String {
    format!("{} - {}", service_label(lead), lead.contact.name)
}

/// Plain-text description stored on the deal.
pub fn deal_description(lead: &LeadRecord) -> String {
    let contact = &lead.contact;
    let mut out = format!("Service: {}\n", service_label(lead));

    out.push_str("\nContactgegevens:\n");
    out.push_str(&format!("- Naam: {}\n", contact.name));
    out.push_str(&format!("- Email: {}\n", contact.email));
    out.push_str(&format!("- Telefoon: {}\n", contact.phone));
    out.push_str(&format!("- Adres: {}\n", contact.address));

    if let Some(service) = &lead.service {
        out.push_str("\nDetails:\n");
        for (name, value) in branch_fields(service) {
            out.push_str(&format!("- {name}: {value}\n"));
        }
    }

    out.push_str("\nAanvullende opties:\n");
    let mut any = false;
    for (kind, entry) in lead.add_ons.selected() {
        any = true;
        out.push_str(&format!(
            "- {} ({}x à €{})\n",
            kind.label(),
            entry.count,
            entry.price
        ));
    }
    if !any {
        out.push_str(&format!("- {NO_ADD_ONS}\n"));
    }

    let meta = &lead.metadata;
    out.push_str("\nMetadata:\n");
    out.push_str(&format!("- Bron: {}\n", meta.source));
    out.push_str(&format!("- Campagne: {}\n", meta.campaign));
    out.push_str(&format!("- Datum: {}\n", meta.submitted_at.to_rfc3339()));
    out
}

/// Branch answers other than consumption, as one line.
fn branch_summary(lead: &LeadRecord) -> String {
    let Some(service) = &lead.service else {
        return NOT_ANSWERED.to_string();
    };
    let parts: Vec<String> = branch_fields(service)
        .into_iter()
        .filter(|(name, value)| *name != "Jaarlijks verbruik" && *value != NOT_ANSWERED)
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    if parts.is_empty() {
        NOT_ANSWERED.to_string()
    } else {
        parts.join(", ")
    }
}

fn add_ons_summary(lead: &LeadRecord) -> String {
    let parts: Vec<String> = lead
        .add_ons
        .selected()
        .map(|(kind, entry)| format!("{} ({}x)", kind.label(), entry.count))
        .collect();
    if parts.is_empty() {
        NO_ADD_ONS.to_string()
    } else {
        parts.join(", ")
    }
}

/// Block Kit message announcing the lead.
pub fn chat_message(lead: &LeadRecord) -> ChatMessage {
    let contact = &lead.contact;
    let service = service_label(lead);
    let consumption = lead
        .service
        .as_ref()
        .map(|s| slot_text(&s.consumption()))
        .unwrap_or(NOT_ANSWERED);
    let received = lead.metadata.submitted_at.format("%d/%m/%Y %H:%M UTC");

    let mrkdwn = |label: &str, value: &str| {
        json!({ "type": "mrkdwn", "text": format!("*{label}:*\n{value}") })
    };

    let blocks = json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": "🔔 Nieuwe Offerte Aanvraag", "emoji": true }
        },
        {
            "type": "section",
            "fields": [mrkdwn("Naam", &contact.name), mrkdwn("Telefoon", &contact.phone)]
        },
        {
            "type": "section",
            "fields": [mrkdwn("Email", &contact.email), mrkdwn("Adres", &contact.address)]
        },
        { "type": "divider" },
        {
            "type": "section",
            "fields": [mrkdwn("Service", service), mrkdwn("Type", &branch_summary(lead))]
        },
        {
            "type": "section",
            "fields": [
                mrkdwn("Verbruik", consumption),
                mrkdwn("Extra opties", &add_ons_summary(lead))
            ]
        },
        {
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": format!("Aanvraag ontvangen op {received}") }]
        }
    ]);

    ChatMessage {
        text: format!("Nieuwe offerte aanvraag: {service} - {}", contact.name),
        blocks,
    }
}
