use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;

use super::domain::{ApplicantId, ApplicantSubmission};
use super::repository::{ApplicantRepository, ConfirmationMailer, RepositoryError};
use super::service::{IntakeService, IntakeServiceError};
use crate::workflows::payments::access::{SessionStore, SessionToken};
use crate::workflows::payments::ledger::AccessLedger;
use crate::workflows::payments::router::SESSION_HEADER;

const OVERVIEW_LIMIT: usize = 50;

/// Shared state for the intake endpoints.
pub struct IntakePortalState<R, M, L, S> {
    pub service: Arc<IntakeService<R, M, L>>,
    pub sessions: Arc<S>,
}

impl<R, M, L, S> Clone for IntakePortalState<R, M, L, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Router builder exposing HTTP endpoints for gated intake and list views.
pub fn intake_router<R, M, L, S>(state: IntakePortalState<R, M, L, S>) -> Router
where
    R: ApplicantRepository + 'static,
    M: ConfirmationMailer + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(submit_handler::<R, M, L, S>).get(overview_handler::<R, M, L, S>),
        )
        .route(
            "/api/v1/applications/:applicant_id",
            get(status_handler::<R, M, L, S>),
        )
        .with_state(state)
}

fn payment_required() -> Response {
    let payload = json!({
        "error": "payment is required before submitting an application",
        "redirect": "/payment/initialize",
    });
    (StatusCode::PAYMENT_REQUIRED, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<R, M, L, S>(
    State(state): State<IntakePortalState<R, M, L, S>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<ApplicantSubmission>,
) -> Response
where
    R: ApplicantRepository + 'static,
    M: ConfirmationMailer + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    let Some(token) = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|raw| SessionToken(raw.to_string()))
    else {
        // No session means no payment trail; send the payer to the gateway.
        return payment_required();
    };

    let Ok(mut session) = state.sessions.load(&token) else {
        let payload = json!({ "error": "session storage unavailable" });
        return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
    };

    let outcome = state.service.submit(&mut session, submission, Utc::now());

    if state.sessions.store(&token, session).is_err() {
        let payload = json!({ "error": "session storage unavailable" });
        return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
    }

    match outcome {
        Ok(applicant) => {
            let payload = json!({
                "applicant": applicant.summary(),
                "message": "your application has been submitted successfully",
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(IntakeServiceError::PaymentRequired) => payment_required(),
        Err(IntakeServiceError::Validation(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(IntakeServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({ "error": "application already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler<R, M, L, S>(
    State(state): State<IntakePortalState<R, M, L, S>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    M: ConfirmationMailer + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    let id = ApplicantId(applicant_id);
    match state.service.get(&id) {
        Ok(applicant) => {
            (StatusCode::OK, axum::Json(applicant.summary())).into_response()
        }
        Err(IntakeServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "application not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn overview_handler<R, M, L, S>(
    State(state): State<IntakePortalState<R, M, L, S>>,
) -> Response
where
    R: ApplicantRepository + 'static,
    M: ConfirmationMailer + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    match state.service.overview(OVERVIEW_LIMIT) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
