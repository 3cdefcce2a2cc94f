//! Payment gating for the application form.
//!
//! A fixed fee paid through Paystack buys a 30-day access grant recorded in
//! the access ledger. Two independent paths settle a payment: the browser's
//! return leg (synchronous verification) and the processor's signed webhook.
//! Both funnel through the ledger's conditional `mark_result` write, which is
//! what keeps the race and webhook redelivery idempotent.

pub mod access;
pub mod domain;
pub mod gateway;
pub mod ledger;
pub mod router;
pub mod service;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use access::{
    AccessDecisionEngine, PaymentSession, SessionError, SessionStore, SessionToken,
};
pub use domain::{
    AccessGrant, Amount, FormAccess, PaymentAttempt, PaymentReference, PaymentResult,
    PaymentStatus, PaymentTransaction, ACCESS_VALIDITY_DAYS, FORM_ACCESS_FEE,
};
pub use gateway::{
    GatewayError, InitializeRequest, InitializedPayment, PaymentGateway, PaystackGateway,
    VerificationStatus,
};
pub use ledger::{AccessLedger, LedgerError, MarkOutcome};
pub use router::{payment_router, PaymentPortalState, SESSION_HEADER, SIGNATURE_HEADER};
pub use service::{
    PaymentInitiated, PaymentService, PaymentServiceError, ReturnVerdict, WebhookDisposition,
    WebhookError,
};
pub use webhook::{
    ChargeCustomer, ChargeData, WebhookPayload, WebhookVerifier, CHARGE_SUCCESS_EVENT,
};
