use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::payments::access::PaymentSession;
use crate::workflows::payments::domain::{Amount, PaymentReference, FORM_ACCESS_FEE};

/// Identifier wrapper for accepted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

static APPLICANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_applicant_id() -> ApplicantId {
    let id = APPLICANT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicantId(format!("applicant-{id:06}"))
}

/// Positions the portal currently advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Agent,
}

impl Position {
    pub const fn label(self) -> &'static str {
        match self {
            Position::Agent => "Agent",
        }
    }
}

/// Nigerian state of residence collected on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateOfResidence {
    Abia,
    Adamawa,
    AkwaIbom,
    Anambra,
    Bauchi,
    Bayelsa,
    Benue,
    Borno,
    CrossRiver,
    Delta,
    Ebonyi,
    Edo,
    Ekiti,
    Enugu,
    #[serde(rename = "fct")]
    FederalCapitalTerritory,
    Gombe,
    Imo,
    Jigawa,
    Kaduna,
    Kano,
    Katsina,
    Kebbi,
    Kogi,
    Kwara,
    Lagos,
    Nasarawa,
    Niger,
    Ogun,
    Ondo,
    Osun,
    Oyo,
    Plateau,
    Rivers,
    Sokoto,
    Taraba,
    Yobe,
    Zamfara,
}

impl StateOfResidence {
    pub const fn label(self) -> &'static str {
        match self {
            StateOfResidence::Abia => "Abia",
            StateOfResidence::Adamawa => "Adamawa",
            StateOfResidence::AkwaIbom => "Akwa Ibom",
            StateOfResidence::Anambra => "Anambra",
            StateOfResidence::Bauchi => "Bauchi",
            StateOfResidence::Bayelsa => "Bayelsa",
            StateOfResidence::Benue => "Benue",
            StateOfResidence::Borno => "Borno",
            StateOfResidence::CrossRiver => "Cross River",
            StateOfResidence::Delta => "Delta",
            StateOfResidence::Ebonyi => "Ebonyi",
            StateOfResidence::Edo => "Edo",
            StateOfResidence::Ekiti => "Ekiti",
            StateOfResidence::Enugu => "Enugu",
            StateOfResidence::FederalCapitalTerritory => "Federal Capital Territory",
            StateOfResidence::Gombe => "Gombe",
            StateOfResidence::Imo => "Imo",
            StateOfResidence::Jigawa => "Jigawa",
            StateOfResidence::Kaduna => "Kaduna",
            StateOfResidence::Kano => "Kano",
            StateOfResidence::Katsina => "Katsina",
            StateOfResidence::Kebbi => "Kebbi",
            StateOfResidence::Kogi => "Kogi",
            StateOfResidence::Kwara => "Kwara",
            StateOfResidence::Lagos => "Lagos",
            StateOfResidence::Nasarawa => "Nasarawa",
            StateOfResidence::Niger => "Niger",
            StateOfResidence::Ogun => "Ogun",
            StateOfResidence::Ondo => "Ondo",
            StateOfResidence::Osun => "Osun",
            StateOfResidence::Oyo => "Oyo",
            StateOfResidence::Plateau => "Plateau",
            StateOfResidence::Rivers => "Rivers",
            StateOfResidence::Sokoto => "Sokoto",
            StateOfResidence::Taraba => "Taraba",
            StateOfResidence::Yobe => "Yobe",
            StateOfResidence::Zamfara => "Zamfara",
        }
    }
}

/// Metadata for an externally stored upload; the bytes themselves live in the
/// file store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub file_name: String,
    pub size_bytes: u64,
    pub storage_key: String,
    /// Filled in during validation from the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Raw form submission before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSubmission {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub state: StateOfResidence,
    pub position: Position,
    pub cv: UploadedDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<UploadedDocument>,
}

/// Snapshot of payment identifiers copied onto the applicant at creation
/// time; later changes to the grant never alter historical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStamp {
    pub payment_email: Option<String>,
    pub payment_reference: Option<PaymentReference>,
    pub payment_verified: bool,
    pub payment_amount: Amount,
}

impl PaymentStamp {
    /// Verification auto-derives from the presence of a reference.
    pub fn from_session(session: &PaymentSession) -> Self {
        let payment_reference = session.payment_reference.clone();
        Self {
            payment_email: session.payment_email.clone(),
            payment_verified: payment_reference.is_some(),
            payment_reference,
            payment_amount: FORM_ACCESS_FEE,
        }
    }
}

/// The accepted application: created once per submission, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub state: StateOfResidence,
    pub position: Position,
    pub cv: UploadedDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<UploadedDocument>,
    pub payment: PaymentStamp,
    pub created_at: DateTime<Utc>,
}

impl Applicant {
    pub fn from_submission(
        submission: ApplicantSubmission,
        payment: PaymentStamp,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: next_applicant_id(),
            full_name: submission.full_name,
            email: submission.email,
            phone: submission.phone,
            address: submission.address,
            state: submission.state,
            position: submission.position,
            cv: submission.cv,
            receipt: submission.receipt,
            payment,
            created_at,
        }
    }
}
