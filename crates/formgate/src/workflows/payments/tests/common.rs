use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::config::PaymentProviderConfig;
use crate::workflows::payments::access::{PaymentSession, SessionError, SessionStore, SessionToken};
use crate::workflows::payments::domain::{
    AccessGrant, FormAccess, PaymentAttempt, PaymentReference, PaymentResult, PaymentTransaction,
};
use crate::workflows::payments::gateway::{
    GatewayError, InitializeRequest, InitializedPayment, PaymentGateway, VerificationStatus,
};
use crate::workflows::payments::ledger::{AccessLedger, LedgerError, MarkOutcome};
use crate::workflows::payments::router::{payment_router, PaymentPortalState};
use crate::workflows::payments::service::PaymentService;
use crate::workflows::payments::webhook::WebhookVerifier;

pub(super) const WEBHOOK_SECRET: &str = "sk_test_local_secret";

pub(super) fn provider_config() -> PaymentProviderConfig {
    PaymentProviderConfig {
        secret_key: WEBHOOK_SECRET.to_string(),
        base_url: "https://api.paystack.test".to_string(),
        callback_url: "http://127.0.0.1:3000/payment/verify".to_string(),
    }
}

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn reference(raw: &str) -> PaymentReference {
    PaymentReference(raw.to_string())
}

pub(super) fn charge_body(reference: &str, email: &str, kobo: u64) -> Vec<u8> {
    serde_json::json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": kobo,
            "customer": { "email": email }
        }
    })
    .to_string()
    .into_bytes()
}

pub(super) fn signed(body: &[u8]) -> String {
    WebhookVerifier::new(WEBHOOK_SECRET).signature(body)
}

/// Ledger fake holding the whole state behind one mutex so the conditional
/// writes mirror the production adapter.
#[derive(Default)]
pub(super) struct MemoryLedger {
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<String, PaymentTransaction>,
    grants: HashMap<String, FormAccess>,
}

impl MemoryLedger {
    pub(super) fn transaction(&self, reference: &PaymentReference) -> Option<PaymentTransaction> {
        self.state
            .lock()
            .expect("ledger mutex poisoned")
            .transactions
            .get(&reference.0)
            .cloned()
    }

    pub(super) fn grant(&self, email: &str) -> Option<FormAccess> {
        self.state
            .lock()
            .expect("ledger mutex poisoned")
            .grants
            .get(email)
            .cloned()
    }

    pub(super) fn transaction_count(&self) -> usize {
        self.state
            .lock()
            .expect("ledger mutex poisoned")
            .transactions
            .len()
    }
}

impl AccessLedger for MemoryLedger {
    fn record_attempt(&self, attempt: PaymentAttempt) -> Result<PaymentTransaction, LedgerError> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        if state.transactions.contains_key(&attempt.reference.0) {
            return Err(LedgerError::Conflict);
        }
        let transaction = attempt.into_transaction();
        state
            .transactions
            .insert(transaction.reference.0.clone(), transaction.clone());
        Ok(transaction)
    }

    fn find_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentTransaction>, LedgerError> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(state.transactions.get(&reference.0).cloned())
    }

    fn mark_result(
        &self,
        reference: &PaymentReference,
        outcome: PaymentResult,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, LedgerError> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        let transaction = state
            .transactions
            .get_mut(&reference.0)
            .ok_or(LedgerError::NotFound)?;
        if transaction.status.is_terminal() {
            return Ok(MarkOutcome::AlreadySettled);
        }
        transaction.status = outcome.status();
        if matches!(outcome, PaymentResult::Success) {
            transaction.access_granted = true;
        }
        transaction.updated_at = at;
        Ok(MarkOutcome::Applied)
    }

    fn grant_access(&self, grant: AccessGrant) -> Result<(), LedgerError> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        state.grants.insert(
            grant.email.clone(),
            FormAccess {
                email: grant.email,
                payment_reference: grant.payment_reference,
                access_expires: grant.access_expires,
                is_active: true,
                created_at: grant.granted_at,
            },
        );
        Ok(())
    }

    fn revoke_access(&self, email: &str) -> Result<(), LedgerError> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        if let Some(access) = state.grants.get_mut(email) {
            access.is_active = false;
        }
        Ok(())
    }

    fn access_for(&self, email: &str) -> Result<Option<FormAccess>, LedgerError> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(state.grants.get(email).cloned())
    }

    fn is_active(&self, email: &str, now: DateTime<Utc>) -> Result<bool, LedgerError> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(state
            .grants
            .get(email)
            .map(|access| access.is_live(now))
            .unwrap_or(false))
    }
}

/// Gateway fake: initialization succeeds with a predictable checkout URL
/// unless a failure is queued, and verification pops scripted outcomes.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    pub(super) initialize_failure: Mutex<Option<GatewayError>>,
    pub(super) verify_outcomes: Mutex<VecDeque<Result<VerificationStatus, GatewayError>>>,
}

impl ScriptedGateway {
    pub(super) fn push_verify(&self, outcome: Result<VerificationStatus, GatewayError>) {
        self.verify_outcomes
            .lock()
            .expect("gateway mutex poisoned")
            .push_back(outcome);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError> {
        if let Some(err) = self
            .initialize_failure
            .lock()
            .expect("gateway mutex poisoned")
            .take()
        {
            return Err(err);
        }
        Ok(InitializedPayment {
            authorization_url: format!("https://checkout.paystack.test/{}", request.reference),
        })
    }

    async fn verify(
        &self,
        _reference: &PaymentReference,
    ) -> Result<VerificationStatus, GatewayError> {
        self.verify_outcomes
            .lock()
            .expect("gateway mutex poisoned")
            .pop_front()
            .unwrap_or(Ok(VerificationStatus::Success))
    }
}

#[derive(Default)]
pub(super) struct MemorySessions {
    sessions: Mutex<HashMap<String, PaymentSession>>,
}

impl SessionStore for MemorySessions {
    fn load(&self, token: &SessionToken) -> Result<PaymentSession, SessionError> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        Ok(sessions.get(&token.0).cloned().unwrap_or_default())
    }

    fn store(&self, token: &SessionToken, session: PaymentSession) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(token.0.clone(), session);
        Ok(())
    }
}

pub(super) fn build_service() -> (
    Arc<PaymentService<ScriptedGateway, MemoryLedger>>,
    Arc<ScriptedGateway>,
    Arc<MemoryLedger>,
) {
    let gateway = Arc::new(ScriptedGateway::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = Arc::new(PaymentService::new(
        gateway.clone(),
        ledger.clone(),
        &provider_config(),
    ));
    (service, gateway, ledger)
}

pub(super) fn build_router() -> (
    axum::Router,
    Arc<ScriptedGateway>,
    Arc<MemoryLedger>,
    Arc<MemorySessions>,
) {
    let (service, gateway, ledger) = build_service();
    let sessions = Arc::new(MemorySessions::default());
    let router = payment_router(PaymentPortalState {
        service,
        sessions: sessions.clone(),
    });
    (router, gateway, ledger, sessions)
}
