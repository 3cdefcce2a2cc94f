use chrono::{DateTime, Utc};

use super::domain::{
    AccessGrant, FormAccess, PaymentAttempt, PaymentReference, PaymentResult, PaymentTransaction,
};

/// Result of applying a terminal outcome to a transaction.
///
/// Both the synchronous verification path and the webhook reconciler funnel
/// through [`AccessLedger::mark_result`], so `AlreadySettled` is an expected
/// answer, not an error: whichever writer observes the result first wins and
/// the other becomes a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Applied,
    AlreadySettled,
}

impl MarkOutcome {
    pub const fn was_applied(self) -> bool {
        matches!(self, MarkOutcome::Applied)
    }
}

/// Error enumeration for ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("payment reference already recorded")]
    Conflict,
    #[error("payment reference not found")]
    NotFound,
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Persisted store of payment transactions and derived access grants; the
/// single source of truth for "does this email currently have access".
///
/// Implementations must make `mark_result` and `grant_access` atomic with
/// respect to concurrent callers: two writers racing on the same reference
/// must resolve inside one conditional write, never a read-modify-write
/// window.
pub trait AccessLedger: Send + Sync {
    /// Open a pending transaction. References are unique and immutable, so a
    /// duplicate is a `Conflict`.
    fn record_attempt(&self, attempt: PaymentAttempt) -> Result<PaymentTransaction, LedgerError>;

    fn find_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentTransaction>, LedgerError>;

    /// Conditionally transition a pending transaction to its terminal state.
    /// Already-terminal transactions are left untouched and reported as
    /// `AlreadySettled`; a successful application also sets `access_granted`.
    fn mark_result(
        &self,
        reference: &PaymentReference,
        outcome: PaymentResult,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, LedgerError>;

    /// Upsert-by-email: an existing grant for the email is overwritten with
    /// the new reference and expiry and reactivated, never duplicated.
    fn grant_access(&self, grant: AccessGrant) -> Result<(), LedgerError>;

    /// Deactivate the grant for an email, if one exists. Called when a
    /// submission consumes the access it paid for; absent grants are a no-op.
    fn revoke_access(&self, email: &str) -> Result<(), LedgerError>;

    fn access_for(&self, email: &str) -> Result<Option<FormAccess>, LedgerError>;

    /// True iff an active, unexpired grant exists for the email.
    fn is_active(&self, email: &str, now: DateTime<Utc>) -> Result<bool, LedgerError>;
}
