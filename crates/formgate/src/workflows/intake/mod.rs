//! Application form intake, gated by the payment workflow.
//!
//! Submissions are accepted only under an active access grant; the accepted
//! record carries a snapshot of the payment identifiers and consumes the
//! grant that authorized it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Applicant, ApplicantId, ApplicantSubmission, PaymentStamp, Position, StateOfResidence,
    UploadedDocument,
};
pub use repository::{
    ApplicantRepository, ApplicantSummary, ConfirmationEmail, ConfirmationMailer, MailError,
    RepositoryError,
};
pub use router::{intake_router, IntakePortalState};
pub use service::{IntakeOverview, IntakeService, IntakeServiceError};
pub use validation::{IntakeViolation, SubmissionGuard, MAX_UPLOAD_BYTES};
