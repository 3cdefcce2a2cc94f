use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::workflows::intake::domain::{
    Applicant, ApplicantId, ApplicantSubmission, Position, StateOfResidence, UploadedDocument,
};
use crate::workflows::intake::repository::{
    ApplicantRepository, ConfirmationEmail, ConfirmationMailer, MailError, RepositoryError,
};
use crate::workflows::intake::router::{intake_router, IntakePortalState};
use crate::workflows::intake::service::IntakeService;
use crate::workflows::payments::access::{
    AccessDecisionEngine, PaymentSession, SessionError, SessionStore, SessionToken,
};
use crate::workflows::payments::domain::{
    AccessGrant, FormAccess, PaymentAttempt, PaymentReference, PaymentResult, PaymentTransaction,
};
use crate::workflows::payments::ledger::{AccessLedger, LedgerError, MarkOutcome};

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn cv() -> UploadedDocument {
    UploadedDocument {
        file_name: "resume.pdf".to_string(),
        size_bytes: 120 * 1024,
        storage_key: "uploads/cv/resume.pdf".to_string(),
        content_type: None,
    }
}

pub(super) fn receipt() -> UploadedDocument {
    UploadedDocument {
        file_name: "teller.jpg".to_string(),
        size_bytes: 80 * 1024,
        storage_key: "uploads/receipts/teller.jpg".to_string(),
        content_type: None,
    }
}

pub(super) fn submission() -> ApplicantSubmission {
    ApplicantSubmission {
        full_name: "Adaeze Okafor".to_string(),
        email: "adaeze@example.com".to_string(),
        phone: "+2348012345678".to_string(),
        address: "12 Marina Road, Lagos Island".to_string(),
        state: StateOfResidence::Lagos,
        position: Position::Agent,
        cv: cv(),
        receipt: None,
    }
}

pub(super) fn paid_session(email: &str) -> PaymentSession {
    PaymentSession {
        payment_email: Some(email.to_string()),
        payment_reference: Some(PaymentReference("ref-paid".to_string())),
        payment_verified: true,
        payment_in_progress: false,
    }
}

/// Ledger fake mirroring the production adapter's conditional writes.
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
    pub(super) fn grant_standard(&self, email: &str) {
        self.grant_access(AccessGrant::with_standard_validity(
            email.to_string(),
            PaymentReference("ref-paid".to_string()),
            t0(),
        ))
        .expect("grant");
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

#[derive(Default)]
pub(super) struct MemoryApplicants {
    records: Mutex<Vec<Applicant>>,
}

impl ApplicantRepository for MemoryApplicants {
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

#[derive(Default)]
pub(super) struct MemoryMailer {
    sent: Mutex<Vec<ConfirmationEmail>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<ConfirmationEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl ConfirmationMailer for MemoryMailer {
    fn send(&self, email: ConfirmationEmail) -> Result<(), MailError> {
        self.sent.lock().expect("mailer mutex poisoned").push(email);
        Ok(())
    }
}

pub(super) struct FailingMailer;

impl ConfirmationMailer for FailingMailer {
    fn send(&self, _email: ConfirmationEmail) -> Result<(), MailError> {
        Err(MailError::Transport("smtp offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemorySessions {
    sessions: Mutex<HashMap<String, PaymentSession>>,
}

impl MemorySessions {
    pub(super) fn preload(&self, token: &str, session: PaymentSession) {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token.to_string(), session);
    }
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
    Arc<IntakeService<MemoryApplicants, MemoryMailer, MemoryLedger>>,
    Arc<MemoryApplicants>,
    Arc<MemoryMailer>,
    Arc<MemoryLedger>,
) {
    let repository = Arc::new(MemoryApplicants::default());
    let mailer = Arc::new(MemoryMailer::default());
    let ledger = Arc::new(MemoryLedger::default());
    let engine = AccessDecisionEngine::new(ledger.clone());
    let service = Arc::new(IntakeService::new(repository.clone(), mailer.clone(), engine));
    (service, repository, mailer, ledger)
}

pub(super) fn build_router() -> (
    axum::Router,
    Arc<MemoryApplicants>,
    Arc<MemoryLedger>,
    Arc<MemorySessions>,
) {
    let (service, repository, _mailer, ledger) = build_service();
    let sessions = Arc::new(MemorySessions::default());
    let router = intake_router(IntakePortalState {
        service,
        sessions: sessions.clone(),
    });
    (router, repository, ledger, sessions)
}
