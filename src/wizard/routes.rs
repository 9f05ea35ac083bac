//! REST endpoints for quote wizard sessions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::controller::{WizardController, WizardView};
use super::model::FieldValue;
use super::sessions::SessionStore;
use crate::error::WizardError;

/// Shared state for the quote routes.
#[derive(Clone)]
pub struct QuoteRouteState {
    pub sessions: Arc<SessionStore>,
}

/// Error body: `{"error": "..."}` with a status matching the failure.
pub enum ApiError {
    Wizard(WizardError),
    Internal(String),
}

impl From<WizardError> for ApiError {
    fn from(e: WizardError) -> Self {
        Self::Wizard(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Wizard(e) => {
                let status = match e {
                    WizardError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                    WizardError::InvalidTransition { .. } | WizardError::ServiceTypeLocked => {
                        StatusCode::CONFLICT
                    }
                    WizardError::FieldNotApplicable { .. }
                    | WizardError::AddOnNotSelected(_)
                    | WizardError::StepOutOfRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, e.to_string())
            }
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn session(state: &QuoteRouteState, id: Uuid) -> ApiResult<Arc<WizardController>> {
    Ok(state.sessions.get(id).await?)
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "solar-quote"
    }))
}

/// POST /api/quote/sessions
async fn create_session(State(state): State<QuoteRouteState>) -> impl IntoResponse {
    let (session_id, wizard) = state.sessions.create().await;
    let view = wizard.current_view().await;
    (
        StatusCode::CREATED,
        Json(json!({ "session_id": session_id, "view": view })),
    )
}

/// GET /api/quote/sessions/{id}
///
/// Current view, submission status and the answers so far.
async fn get_session(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let wizard = session(&state, id).await?;
    Ok(Json(json!({
        "view": wizard.current_view().await,
        "submission": wizard.submission_state().await,
        "answers": wizard.answers().await,
    })))
}

/// DELETE /api/quote/sessions/{id}
async fn delete_session(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/quote/sessions/{id}/answers
async fn post_answer(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
    Json(value): Json<FieldValue>,
) -> ApiResult<Json<WizardView>> {
    let wizard = session(&state, id).await?;
    Ok(Json(wizard.submit_answer(value).await?))
}

async fn advance(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    Ok(Json(session(&state, id).await?.advance().await?))
}

async fn retreat(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    Ok(Json(session(&state, id).await?.retreat().await?))
}

async fn reset(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    Ok(Json(session(&state, id).await?.reset().await?))
}

async fn resume(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    Ok(Json(session(&state, id).await?.resume().await?))
}

/// POST /api/quote/sessions/{id}/submit
///
/// The pipeline runs on its own task so a dropped connection cannot leave
/// the session stuck in `Submitting`.
async fn submit(
    State(state): State<QuoteRouteState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let wizard = session(&state, id).await?;
    let task = tokio::spawn({
        let wizard = wizard.clone();
        async move { wizard.submit().await }
    });

    let status = task.await.map_err(|e| {
        error!(session_id = %id, error = %e, "Submission task failed");
        ApiError::Internal("Submission task failed".to_string())
    })??;

    Ok(Json(json!({
        "result": status,
        "view": wizard.current_view().await,
    })))
}

/// Build the quote wizard REST routes.
pub fn quote_routes(state: QuoteRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/quote/sessions", post(create_session))
        .route(
            "/api/quote/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/quote/sessions/{id}/answers", post(post_answer))
        .route("/api/quote/sessions/{id}/advance", post(advance))
        .route("/api/quote/sessions/{id}/retreat", post(retreat))
        .route("/api/quote/sessions/{id}/submit", post(submit))
        .route("/api/quote/sessions/{id}/reset", post(reset))
        .route("/api/quote/sessions/{id}/resume", post(resume))
        .with_state(state)
}
