//! Integration tests for the quote wizard REST API.
//!
//! Each test spins up the quote routes on a random port with a stub CRM and
//! chat transport, then walks the wizard over HTTP with reqwest.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use solar_quote::chat::{ChatMessage, ChatNotifier, ChatTransport};
use solar_quote::crm::{ContactId, CrmClient, DealId, DealUpdate, NewContact, NewDeal};
use solar_quote::error::{ChatError, CrmError};
use solar_quote::pipeline::{LeadSource, SubmissionPipeline};
use solar_quote::wizard::{QuoteRouteState, SessionStore, quote_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub CRM that records deals and can refuse contacts.
#[derive(Default)]
struct StubCrm {
    refuse_contacts: bool,
    deals: Mutex<Vec<NewDeal>>,
}

#[async_trait]
impl CrmClient for StubCrm {
    async fn create_contact(&self, _contact: &NewContact) -> Result<ContactId, CrmError> {
        if self.refuse_contacts {
            return Err(CrmError::Rejected {
                operation: "create_contact".to_string(),
                status: 401,
                body: "unauthorized".to_string(),
            });
        }
        Ok(7)
    }

    async fn create_deal(&self, deal: &NewDeal) -> Result<DealId, CrmError> {
        self.deals.lock().unwrap().push(deal.clone());
        Ok(99)
    }

    async fn update_deal(&self, _deal_id: DealId, _update: &DealUpdate) -> Result<(), CrmError> {
        Ok(())
    }

    async fn add_note(&self, _deal_id: DealId, _text: &str) -> Result<(), CrmError> {
        Ok(())
    }
}

/// Stub chat transport that always fails.
struct DownChat;

#[async_trait]
impl ChatTransport for DownChat {
    fn name(&self) -> &str {
        "down"
    }

    async fn post_message(&self, _message: &ChatMessage) -> Result<(), ChatError> {
        Err(ChatError::SendFailed {
            name: "down".to_string(),
            reason: "connection reset".to_string(),
        })
    }
}

/// Start the quote server on a random port, return (base url, crm).
async fn start_server(crm: StubCrm) -> (String, Arc<StubCrm>) {
    let crm = Arc::new(crm);
    let chat = ChatNotifier::new(vec![Arc::new(DownChat)]);
    let pipeline = Arc::new(SubmissionPipeline::new(crm.clone(), chat));
    let sessions = Arc::new(SessionStore::new(
        pipeline,
        LeadSource::default(),
        Duration::from_secs(60),
    ));
    let app = quote_routes(QuoteRouteState { sessions });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), crm)
}

/// Thin client around one wizard session.
struct Session {
    http: reqwest::Client,
    url: String,
}

impl Session {
    async fn start(base: &str) -> (Self, Value) {
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{base}/api/quote/sessions"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        let id = body["session_id"].as_str().unwrap().to_string();
        (
            Self {
                http,
                url: format!("{base}/api/quote/sessions/{id}"),
            },
            body["view"].clone(),
        )
    }

    async fn post(&self, action: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self.http.post(format!("{}/{action}", self.url));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn answer(&self, field: &str, value: Value) -> Value {
        let (status, view) = self
            .post("answers", Some(json!({"field": field, "value": value})))
            .await;
        assert_eq!(status, 200, "answer {field} failed: {view}");
        view
    }

    async fn advance(&self) -> Value {
        let (status, view) = self.post("advance", None).await;
        assert_eq!(status, 200);
        view
    }

    async fn get(&self) -> Value {
        self.http
            .get(&self.url)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn fill_contact(&self) {
        self.answer("contact_name", json!("Lotte Maes")).await;
        self.answer("contact_phone", json!("0485 11 22 33")).await;
        self.answer("contact_email", json!("lotte@example.be")).await;
        self.answer("contact_address", json!("Stationsstraat 12, 2800 Mechelen"))
            .await;
    }
}

#[tokio::test]
async fn ev_charger_walk_submits_lead() {
    timeout(TEST_TIMEOUT, async {
        let (base, crm) = start_server(StubCrm::default()).await;
        let (session, view) = Session::start(&base).await;
        assert_eq!(view["question"], "service_type");
        assert_eq!(view["options"].as_array().unwrap().len(), 4);

        session.answer("service_type", json!("ev_charger")).await;
        let view = session.advance().await;
        assert_eq!(view["question"], "phase_connection");

        session.answer("phase", json!("three")).await;
        let view = session.advance().await;
        assert_eq!(view["question"], "existing_equipment");

        session.answer("existing_equipment", json!("solar_panels")).await;
        let view = session.advance().await;
        assert_eq!(view["step"], 5, "consumption step is skipped");
        assert_eq!(view["kind"], "contact_form");

        session.fill_contact().await;
        session
            .answer("add_on", json!({"kind": "heat_pump", "selected": true}))
            .await;
        let view = session
            .answer("add_on_count", json!({"kind": "heat_pump", "count": 3}))
            .await;
        let heat_pump = view["add_ons"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["kind"] == "heat_pump")
            .unwrap()
            .clone();
        assert_eq!(heat_pump["count"], 3);

        let (status, body) = session.post("submit", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["result"]["status"], "completed");
        assert_eq!(body["result"]["outcome"]["success"], true);
        assert_eq!(body["result"]["outcome"]["deal_id"], 99);
        // Chat was down; the lead still counts as delivered.
        assert_eq!(body["result"]["outcome"]["chat"]["delivered"], false);
        assert_eq!(body["view"]["state"], "succeeded");

        let deals = crm.deals.lock().unwrap().clone();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].title, "Laadpaal - Lotte Maes");
        let description = deals[0].description.clone().unwrap_or_default();
        assert!(description.contains("- Aansluiting: 3-fase"));
        assert!(description.contains("- Jaarlijks verbruik: n.v.t."));
        assert!(description.contains("Airco / warmtepomp (3x"));

        let state = session.get().await;
        assert_eq!(state["submission"]["status"], "succeeded");
        assert_eq!(state["submission"]["deal_id"], 99);

        let (status, view) = session.post("reset", None).await;
        assert_eq!(status, 200);
        assert_eq!(view["step"], 1);
        let state = session.get().await;
        assert_eq!(state["answers"]["service"], Value::Null);
        assert_eq!(state["answers"]["contact"]["name"], "");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn blank_contact_field_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let (base, crm) = start_server(StubCrm::default()).await;
        let (session, _) = Session::start(&base).await;

        session.answer("service_type", json!("solar")).await;
        for _ in 0..4 {
            session.advance().await;
        }
        session.answer("contact_name", json!("Lotte Maes")).await;

        let (status, body) = session.post("submit", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["result"]["status"], "rejected");
        assert_eq!(body["result"]["message"], "Vul alstublieft alle gegevens in.");
        assert_eq!(body["view"]["step"], 5);
        assert_eq!(body["view"]["error"], "Vul alstublieft alle gegevens in.");
        assert!(crm.deals.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_submission_resumes_on_contact_form() {
    timeout(TEST_TIMEOUT, async {
        let (base, _crm) = start_server(StubCrm {
            refuse_contacts: true,
            ..Default::default()
        })
        .await;
        let (session, _) = Session::start(&base).await;

        session.answer("service_type", json!("battery")).await;
        session.advance().await;
        session.answer("hybrid_inverter", json!(false)).await;
        let view = session.advance().await;
        assert_eq!(view["question"], "consumption");
        session.answer("consumption", json!("very_high")).await;
        session.advance().await;
        session.fill_contact().await;

        let (_, body) = session.post("submit", None).await;
        assert_eq!(body["result"]["outcome"]["success"], false);
        assert_eq!(body["view"]["state"], "failed");
        assert_eq!(
            body["view"]["message"],
            "Er is een fout opgetreden. Probeer het opnieuw."
        );

        // Answering while failed is a conflict.
        let (status, _) = session
            .post("answers", Some(json!({"field": "contact_name", "value": "X"})))
            .await;
        assert_eq!(status, 409);

        let (status, view) = session.post("resume", None).await;
        assert_eq!(status, 200);
        assert_eq!(view["step"], 5);
        let fields = view["fields"].as_array().unwrap();
        assert_eq!(fields[0]["value"], "Lotte Maes");

        let state = session.get().await;
        assert_eq!(
            state["answers"]["service"]["inverter_brand"],
            "not_applicable"
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_answer_is_unprocessable() {
    timeout(TEST_TIMEOUT, async {
        let (base, _crm) = start_server(StubCrm::default()).await;
        let (session, _) = Session::start(&base).await;

        let (status, _) = session
            .post("answers", Some(json!({"field": "service_type", "value": "wind_turbine"})))
            .await;
        assert_eq!(status, 422);

        session.answer("service_type", json!("solar")).await;
        session.advance().await;
        let (status, body) = session
            .post("answers", Some(json!({"field": "phase", "value": "single"})))
            .await;
        assert_eq!(status, 422);
        assert!(body["error"].as_str().unwrap().contains("phase"));
    })
    .await
    .expect("test timed out");
}
