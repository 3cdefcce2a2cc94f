use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::access::{PaymentSession, SessionStore, SessionToken};
use super::domain::PaymentReference;
use super::gateway::{GatewayError, PaymentGateway};
use super::ledger::{AccessLedger, LedgerError};
use super::service::{
    PaymentService, PaymentServiceError, ReturnVerdict, WebhookDisposition, WebhookError,
};

/// Header carrying the browser's session token. Handlers mint a fresh token
/// when the header is absent and echo it back in the response body.
pub const SESSION_HEADER: &str = "x-intake-session";

/// Header carrying the processor's webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Shared state for the payment endpoints.
pub struct PaymentPortalState<G, L, S> {
    pub service: Arc<PaymentService<G, L>>,
    pub sessions: Arc<S>,
}

impl<G, L, S> Clone for PaymentPortalState<G, L, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Router builder exposing the payment gateway, verification, webhook, and
/// access-probe endpoints.
pub fn payment_router<G, L, S>(state: PaymentPortalState<G, L, S>) -> Router
where
    G: PaymentGateway + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/payment/initialize", post(initialize_handler::<G, L, S>))
        .route("/payment/verify", get(verify_handler::<G, L, S>))
        .route("/payment/webhook", post(webhook_handler::<G, L, S>))
        .route("/payment/access", get(access_handler::<G, L, S>))
        .with_state(state)
}

fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|raw| SessionToken(raw.to_string()))
}

fn session_failure() -> Response {
    let payload = json!({ "error": "session storage unavailable" });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitializeForm {
    #[serde(default)]
    pub(crate) email: String,
}

pub(crate) async fn initialize_handler<G, L, S>(
    State(state): State<PaymentPortalState<G, L, S>>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<InitializeForm>,
) -> Response
where
    G: PaymentGateway + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    let token = session_token(&headers).unwrap_or_else(SessionToken::generate);
    let Ok(mut session) = state.sessions.load(&token) else {
        return session_failure();
    };

    match state
        .service
        .start_payment(&form.email, &mut session, Utc::now())
        .await
    {
        Ok(initiated) => {
            if state.sessions.store(&token, session).is_err() {
                return session_failure();
            }
            let payload = json!({
                "authorization_url": initiated.authorization_url,
                "reference": initiated.reference,
                "session": token.0,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(PaymentServiceError::MissingEmail) => {
            let payload = json!({ "error": "please provide a valid email address" });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(PaymentServiceError::Gateway(err)) => gateway_failure(err),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn gateway_failure(err: GatewayError) -> Response {
    let message = match err {
        GatewayError::Transport(_) => {
            "could not reach the payment processor, please try again".to_string()
        }
        GatewayError::Rejected { message } => message,
        GatewayError::UnexpectedPayload(_) => {
            "payment processor returned an unexpected response, please try again".to_string()
        }
    };
    let payload = json!({ "error": message, "retryable": true });
    (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyParams {
    pub(crate) reference: Option<String>,
}

pub(crate) async fn verify_handler<G, L, S>(
    State(state): State<PaymentPortalState<G, L, S>>,
    headers: HeaderMap,
    Query(params): Query<VerifyParams>,
) -> Response
where
    G: PaymentGateway + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    let (Some(reference), Some(token)) = (params.reference, session_token(&headers)) else {
        let payload = json!({
            "error": "invalid payment verification, please start the payment again",
            "redirect": "/payment/initialize",
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    let Ok(mut session) = state.sessions.load(&token) else {
        return session_failure();
    };

    let reference = PaymentReference(reference);
    let verdict = state
        .service
        .confirm_return(&mut session, &reference, Utc::now())
        .await;

    if state.sessions.store(&token, session).is_err() {
        return session_failure();
    }

    match verdict {
        Ok(ReturnVerdict::AccessGranted { transaction }) => {
            let payload = json!({
                "status": "success",
                "message": "payment successful, you can now access the application form",
                "transaction": transaction,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(ReturnVerdict::Declined { message }) => {
            let payload = json!({ "status": "failed", "error": message });
            (StatusCode::PAYMENT_REQUIRED, axum::Json(payload)).into_response()
        }
        Ok(ReturnVerdict::StillPending { raw_status }) => {
            let payload = json!({ "status": "pending", "raw_status": raw_status });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(PaymentServiceError::MissingSession) => {
            let payload = json!({
                "error": "invalid payment verification, please start the payment again",
                "redirect": "/payment/initialize",
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(PaymentServiceError::Ledger(LedgerError::NotFound)) => {
            let payload = json!({ "error": "transaction not found, please contact support" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(PaymentServiceError::Gateway(err)) => gateway_failure(err),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn webhook_handler<G, L, S>(
    State(state): State<PaymentPortalState<G, L, S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    G: PaymentGateway + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match state.service.process_webhook(&body, signature, Utc::now()) {
        Ok(WebhookDisposition::AccessGranted) | Ok(WebhookDisposition::AlreadySettled) => {
            let payload = json!({ "status": "success" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(WebhookDisposition::Ignored { event }) => {
            let payload = json!({ "status": "ignored", "event": event });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(WebhookError::InvalidSignature) => {
            let payload = json!({ "status": "invalid signature" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        Err(WebhookError::MalformedPayload(_)) => {
            let payload = json!({ "status": "invalid JSON" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(WebhookError::Ledger(_)) => {
            let payload = json!({ "status": "error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessParams {
    pub(crate) email: String,
}

pub(crate) async fn access_handler<G, L, S>(
    State(state): State<PaymentPortalState<G, L, S>>,
    Query(params): Query<AccessParams>,
) -> Response
where
    G: PaymentGateway + 'static,
    L: AccessLedger + 'static,
    S: SessionStore + 'static,
{
    match state.service.access_status(&params.email) {
        Ok(Some(access)) => {
            let payload = json!({
                "active": access.is_live(Utc::now()),
                "access_expires": access.access_expires,
                "payment_reference": access.payment_reference,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(None) => {
            let payload = json!({ "active": false });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
