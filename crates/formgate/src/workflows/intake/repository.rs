use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Applicant, ApplicantId};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicantRepository: Send + Sync {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError>;
    fn fetch(&self, id: &ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<Applicant>, RepositoryError>;
    fn count(&self) -> Result<u64, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound seam for the post-submission confirmation email.
pub trait ConfirmationMailer: Send + Sync {
    fn send(&self, email: ConfirmationEmail) -> Result<(), MailError>;
}

/// Rendered confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an applicant for list views.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantSummary {
    pub id: ApplicantId,
    pub full_name: String,
    pub email: String,
    pub state: &'static str,
    pub position: &'static str,
    pub payment_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Applicant {
    pub fn summary(&self) -> ApplicantSummary {
        ApplicantSummary {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            state: self.state.label(),
            position: self.position.label(),
            payment_verified: self.payment.payment_verified,
            created_at: self.created_at,
        }
    }
}
