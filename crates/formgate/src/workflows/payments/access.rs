use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::PaymentReference;
use super::ledger::{AccessLedger, LedgerError};

/// Opaque token identifying one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Request-scoped payment state carried between the gateway, verification,
/// and intake handlers. The `payment_verified` flag is a cache over the
/// ledger, never the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub payment_email: Option<String>,
    pub payment_reference: Option<PaymentReference>,
    pub payment_verified: bool,
    pub payment_in_progress: bool,
}

impl PaymentSession {
    pub fn begin_payment(&mut self, email: String, reference: PaymentReference) {
        self.payment_email = Some(email);
        self.payment_reference = Some(reference);
        self.payment_verified = false;
        self.payment_in_progress = true;
    }
}

/// Error enumeration for session store failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Process-external key/value storage for [`PaymentSession`] records.
pub trait SessionStore: Send + Sync {
    /// Missing tokens load as an empty session.
    fn load(&self, token: &SessionToken) -> Result<PaymentSession, SessionError>;

    fn store(&self, token: &SessionToken, session: PaymentSession) -> Result<(), SessionError>;
}

/// Reconciles ephemeral session state against the access ledger to answer
/// "is this request authorized". Invoked by both the gating layer and the
/// form submission handler so the two never disagree within one request.
///
/// The engine never grants access itself; only the webhook reconciler and
/// the post-verification step write grants.
pub struct AccessDecisionEngine<L> {
    ledger: Arc<L>,
}

impl<L> Clone for AccessDecisionEngine<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L> AccessDecisionEngine<L>
where
    L: AccessLedger,
{
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Two-tier lookup: the session cache answers immediately; otherwise the
    /// ledger is consulted for the session's candidate email, and a hit
    /// primes the cache for the rest of the session.
    pub fn has_access(
        &self,
        session: &mut PaymentSession,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        if session.payment_verified {
            return Ok(true);
        }

        let Some(email) = session.payment_email.clone() else {
            return Ok(false);
        };

        if self.ledger.is_active(&email, now)? {
            session.payment_verified = true;
            return Ok(true);
        }

        Ok(false)
    }

    /// Completion signal from the form intake: one successful payment
    /// authorizes exactly one submission. The session cache is cleared and
    /// the durable grant consumed, so the next request falls through both
    /// tiers until a new payment succeeds.
    pub fn complete_submission(&self, session: &mut PaymentSession) -> Result<(), LedgerError> {
        if let Some(email) = session.payment_email.as_deref() {
            self.ledger.revoke_access(email)?;
        }
        session.payment_verified = false;
        session.payment_in_progress = false;
        Ok(())
    }
}
