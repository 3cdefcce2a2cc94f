use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::access::PaymentSession;
use super::domain::{
    AccessGrant, Amount, FormAccess, PaymentAttempt, PaymentReference, PaymentResult,
    PaymentTransaction, FORM_ACCESS_FEE,
};
use super::gateway::{GatewayError, InitializeRequest, PaymentGateway, VerificationStatus};
use super::ledger::{AccessLedger, LedgerError, MarkOutcome};
use super::webhook::{parse_payload, WebhookPayload, WebhookVerifier};
use crate::config::PaymentProviderConfig;

/// Successful initialization handed back to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInitiated {
    pub authorization_url: String,
    pub reference: PaymentReference,
}

/// Outcome of the synchronous verification path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnVerdict {
    AccessGranted { transaction: PaymentTransaction },
    Declined { message: String },
    StillPending { raw_status: String },
}

/// Outcome of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    AccessGranted,
    AlreadySettled,
    Ignored { event: String },
}

/// Error raised by the payment service.
#[derive(Debug, thiserror::Error)]
pub enum PaymentServiceError {
    #[error("please provide a valid email address")]
    MissingEmail,
    #[error("invalid payment verification, please start the payment again")]
    MissingSession,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Error raised while processing a webhook delivery. Nothing here is ever
/// user-visible; the caller is the payment processor.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Composes the payment gateway and the access ledger: initiates payments,
/// reconciles both verification paths, and derives access grants.
pub struct PaymentService<G, L> {
    gateway: Arc<G>,
    ledger: Arc<L>,
    verifier: WebhookVerifier,
    callback_url: String,
    fee: Amount,
}

impl<G, L> PaymentService<G, L>
where
    G: PaymentGateway + 'static,
    L: AccessLedger + 'static,
{
    pub fn new(gateway: Arc<G>, ledger: Arc<L>, config: &PaymentProviderConfig) -> Self {
        Self {
            gateway,
            ledger,
            verifier: WebhookVerifier::new(config.secret_key.clone()),
            callback_url: config.callback_url.clone(),
            fee: FORM_ACCESS_FEE,
        }
    }

    /// Initiate a payment: generate the reference, ask the processor for an
    /// authorization URL, open the pending transaction, and stamp the
    /// session so the return leg can be tied back to this attempt.
    pub async fn start_payment(
        &self,
        email: &str,
        session: &mut PaymentSession,
        now: DateTime<Utc>,
    ) -> Result<PaymentInitiated, PaymentServiceError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(PaymentServiceError::MissingEmail);
        }

        let reference = PaymentReference::generate();
        let initialized = self
            .gateway
            .initialize(InitializeRequest {
                email: email.to_string(),
                amount: self.fee,
                reference: reference.clone(),
                callback_url: self.callback_url.clone(),
            })
            .await?;

        self.ledger.record_attempt(PaymentAttempt {
            email: email.to_string(),
            amount: self.fee,
            reference: reference.clone(),
            requested_at: now,
        })?;

        session.begin_payment(email.to_string(), reference.clone());
        info!(%reference, "payment initiated");

        Ok(PaymentInitiated {
            authorization_url: initialized.authorization_url,
            reference,
        })
    }

    /// Synchronous verification, invoked when the browser returns from the
    /// processor. Shares the `mark_result` conditional write with the
    /// webhook reconciler, so whichever path observes success first wins and
    /// the other is a no-op.
    pub async fn confirm_return(
        &self,
        session: &mut PaymentSession,
        reference: &PaymentReference,
        now: DateTime<Utc>,
    ) -> Result<ReturnVerdict, PaymentServiceError> {
        let Some(email) = session.payment_email.clone() else {
            return Err(PaymentServiceError::MissingSession);
        };

        let status = match self.gateway.verify(reference).await {
            Ok(status) => status,
            Err(GatewayError::Rejected { message }) => {
                return Ok(self.settle_declined(session, reference, message, now)?);
            }
            Err(other) => return Err(other.into()),
        };

        match status {
            VerificationStatus::Success => {
                let outcome = self
                    .ledger
                    .mark_result(reference, PaymentResult::Success, now)?;
                if outcome.was_applied() {
                    self.ledger.grant_access(AccessGrant::with_standard_validity(
                        email.clone(),
                        reference.clone(),
                        now,
                    ))?;
                    info!(%reference, "payment verified on return leg");
                }

                session.payment_verified = true;
                session.payment_in_progress = false;

                let transaction = self
                    .ledger
                    .find_transaction(reference)?
                    .ok_or(LedgerError::NotFound)?;
                Ok(ReturnVerdict::AccessGranted { transaction })
            }
            VerificationStatus::Failed { raw_status } => Ok(self.settle_declined(
                session,
                reference,
                format!("payment was not successful (status: {raw_status})"),
                now,
            )?),
            VerificationStatus::Pending { raw_status } => {
                // Not a terminal transition: the transaction stays pending and
                // the in-progress flag is kept for a later retry or webhook.
                Ok(ReturnVerdict::StillPending { raw_status })
            }
        }
    }

    fn settle_declined(
        &self,
        session: &mut PaymentSession,
        reference: &PaymentReference,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<ReturnVerdict, LedgerError> {
        // A reference the ledger never saw is tolerated here, matching the
        // lookup-or-create tolerance on the webhook side.
        match self
            .ledger
            .mark_result(reference, PaymentResult::Failed, now)
        {
            Ok(_) | Err(LedgerError::NotFound) => {}
            Err(other) => return Err(other),
        }

        // Failure only clears the in-progress flag; an earlier grant for the
        // same email from a separate successful payment stays untouched.
        session.payment_in_progress = false;
        Ok(ReturnVerdict::Declined { message })
    }

    /// Webhook reconciler: authenticate, parse, then idempotently apply a
    /// charge success to the ledger. Redelivery of an already-applied event
    /// is silently absorbed.
    pub fn process_webhook(
        &self,
        body: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookDisposition, WebhookError> {
        if !self.verifier.verify(body, signature) {
            warn!("webhook rejected: signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        let charge = match parse_payload(body)? {
            WebhookPayload::ChargeSucceeded(charge) => charge,
            WebhookPayload::Other { event } => {
                return Ok(WebhookDisposition::Ignored { event });
            }
        };

        let reference = PaymentReference(charge.reference);
        let email = charge.customer.email;

        // The webhook may arrive before, after, or instead of the browser
        // redirect; an existing transaction for the reference is fine.
        match self.ledger.record_attempt(PaymentAttempt {
            email: email.clone(),
            amount: Amount::from_minor_units(charge.amount),
            reference: reference.clone(),
            requested_at: now,
        }) {
            Ok(_) | Err(LedgerError::Conflict) => {}
            Err(other) => return Err(other.into()),
        }

        let outcome = self
            .ledger
            .mark_result(&reference, PaymentResult::Success, now)?;
        match outcome {
            MarkOutcome::Applied => {
                self.ledger.grant_access(AccessGrant::with_standard_validity(
                    email.clone(),
                    reference.clone(),
                    now,
                ))?;
                info!(%email, %reference, "webhook settled payment");
                Ok(WebhookDisposition::AccessGranted)
            }
            MarkOutcome::AlreadySettled => Ok(WebhookDisposition::AlreadySettled),
        }
    }

    /// Current grant for an email, if any; used by the access status probe.
    pub fn access_status(&self, email: &str) -> Result<Option<FormAccess>, PaymentServiceError> {
        Ok(self.ledger.access_for(email)?)
    }
}
