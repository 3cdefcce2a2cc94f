use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use formgate::workflows::intake::{
    Applicant, ApplicantId, ApplicantRepository, ConfirmationEmail, ConfirmationMailer, MailError,
    RepositoryError,
};
use formgate::workflows::payments::{
    AccessGrant, AccessLedger, FormAccess, LedgerError, MarkOutcome, PaymentAttempt,
    PaymentReference, PaymentResult, PaymentSession, PaymentTransaction, SessionError,
    SessionStore, SessionToken,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Single-process ledger. Everything sits behind one mutex, which is what
/// makes `mark_result` and `grant_access` atomic with respect to the
/// webhook/verification race.
#[derive(Default)]
pub(crate) struct InMemoryAccessLedger {
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<String, PaymentTransaction>,
    grants: HashMap<String, FormAccess>,
}

impl AccessLedger for InMemoryAccessLedger {
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

#[derive(Default)]
pub(crate) struct InMemoryApplicantRepository {
    records: Mutex<Vec<Applicant>>,
}

impl ApplicantRepository for InMemoryApplicantRepository {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        if records.iter().any(|stored| stored.id == applicant.id) {
            return Err(RepositoryError::Conflict);
        }
        records.push(applicant.clone());
        Ok(applicant)
    }

    fn fetch(&self, id: &ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records.iter().find(|stored| &stored.id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Applicant>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records.len() as u64)
    }
}

/// Mailer placeholder until an SMTP relay is wired up: confirmations are
/// written to the log so operators can see what would have been sent.
#[derive(Default)]
pub(crate) struct LoggingMailer;

impl ConfirmationMailer for LoggingMailer {
    fn send(&self, email: ConfirmationEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "confirmation email queued");
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, PaymentSession>>,
}

impl SessionStore for InMemorySessionStore {
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
