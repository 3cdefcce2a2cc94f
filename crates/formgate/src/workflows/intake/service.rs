use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{Applicant, ApplicantId, ApplicantSubmission, PaymentStamp};
use super::repository::{
    ApplicantRepository, ApplicantSummary, ConfirmationEmail, ConfirmationMailer, RepositoryError,
};
use super::validation::{IntakeViolation, SubmissionGuard};
use crate::workflows::payments::access::{AccessDecisionEngine, PaymentSession};
use crate::workflows::payments::ledger::{AccessLedger, LedgerError};

/// Aggregate used by the landing page counter and the admin list view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IntakeOverview {
    pub total_applicants: u64,
    pub recent: Vec<ApplicantSummary>,
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error("payment is required before submitting an application")]
    PaymentRequired,
    #[error(transparent)]
    Validation(#[from] IntakeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Service composing the submission guard, applicant repository, mailer, and
/// the access decision engine that gates every submission.
pub struct IntakeService<R, M, L> {
    guard: SubmissionGuard,
    repository: Arc<R>,
    mailer: Arc<M>,
    engine: AccessDecisionEngine<L>,
}

impl<R, M, L> IntakeService<R, M, L>
where
    R: ApplicantRepository + 'static,
    M: ConfirmationMailer + 'static,
    L: AccessLedger + 'static,
{
    pub fn new(repository: Arc<R>, mailer: Arc<M>, engine: AccessDecisionEngine<L>) -> Self {
        Self {
            guard: SubmissionGuard,
            repository,
            mailer,
            engine,
        }
    }

    /// Accept a submission under an active grant. The same engine answers
    /// here and in the gating layer, so the two verdicts cannot diverge
    /// within one request; an accepted submission then consumes the grant.
    pub fn submit(
        &self,
        session: &mut PaymentSession,
        submission: ApplicantSubmission,
        now: DateTime<Utc>,
    ) -> Result<Applicant, IntakeServiceError> {
        if !self.engine.has_access(session, now)? {
            return Err(IntakeServiceError::PaymentRequired);
        }

        let sanitized = self.guard.validate(submission)?;
        let applicant =
            Applicant::from_submission(sanitized, PaymentStamp::from_session(session), now);
        let stored = self.repository.insert(applicant)?;

        if let Err(err) = self.mailer.send(confirmation_email(&stored)) {
            // Submission already persisted; a lost email is not fatal.
            warn!(applicant = %stored.id.0, error = %err, "confirmation email failed");
        }

        self.engine.complete_submission(session)?;
        info!(applicant = %stored.id.0, "application accepted");
        Ok(stored)
    }

    pub fn get(&self, id: &ApplicantId) -> Result<Applicant, IntakeServiceError> {
        let applicant = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(applicant)
    }

    pub fn overview(&self, limit: usize) -> Result<IntakeOverview, IntakeServiceError> {
        let total_applicants = self.repository.count()?;
        let recent = self
            .repository
            .recent(limit)?
            .iter()
            .map(Applicant::summary)
            .collect();
        Ok(IntakeOverview {
            total_applicants,
            recent,
        })
    }
}

fn confirmation_email(applicant: &Applicant) -> ConfirmationEmail {
    let mut body = String::new();
    writeln!(body, "Dear {},", applicant.full_name).expect("write salutation");
    writeln!(body).expect("write blank line");
    writeln!(
        body,
        "We have successfully received your application for the {} position.",
        applicant.position.label()
    )
    .expect("write confirmation");
    writeln!(body).expect("write blank line");
    writeln!(body, "Application details:").expect("write details header");
    writeln!(body, "- Name: {}", applicant.full_name).expect("write name");
    writeln!(body, "- Position: {}", applicant.position.label()).expect("write position");
    writeln!(body, "- Email: {}", applicant.email).expect("write email");
    writeln!(body, "- Phone: {}", applicant.phone).expect("write phone");
    writeln!(body, "- State: {}", applicant.state.label()).expect("write state");
    writeln!(
        body,
        "- Submitted: {}",
        applicant.created_at.format("%B %d, %Y at %H:%M")
    )
    .expect("write timestamp");
    writeln!(body).expect("write blank line");
    writeln!(
        body,
        "Our HR team will review your application and contact you within 5-7 business days."
    )
    .expect("write closing");

    ConfirmationEmail {
        to: applicant.email.clone(),
        subject: format!(
            "{} Position Application Confirmation",
            applicant.position.label()
        ),
        body,
    }
}
