use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fee charged for one application form access, in naira.
pub const FORM_ACCESS_FEE: Amount = Amount::from_naira(2_500);

/// How long a granted access stays live, counted from the moment the grant
/// is processed rather than from payment time.
pub const ACCESS_VALIDITY_DAYS: i64 = 30;

/// Identifier wrapper for one payment attempt, unique end-to-end across
/// initiation, verification, and webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentReference(pub String);

impl PaymentReference {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exact integer money amount in naira. Paystack transmits kobo (hundredths),
/// so the conversion is a plain integer multiply with no rounding loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u32);

impl Amount {
    pub const fn from_naira(naira: u32) -> Self {
        Self(naira)
    }

    /// Whole kobo truncated back to naira; the fee constant always divides
    /// evenly so the round trip is lossless for amounts this system issues.
    pub const fn from_minor_units(kobo: u64) -> Self {
        let naira = kobo / 100;
        if naira > u32::MAX as u64 {
            Self(u32::MAX)
        } else {
            Self(naira as u32)
        }
    }

    pub const fn naira(self) -> u32 {
        self.0
    }

    pub const fn to_minor_units(self) -> u64 {
        self.0 as u64 * 100
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\u{20a6}{}", self.0)
    }
}

/// Lifecycle of a payment attempt. The only legal transitions are
/// pending -> success and pending -> failed; terminal states never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Terminal outcome a writer may apply to a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentResult {
    Success,
    Failed,
}

impl PaymentResult {
    pub const fn status(self) -> PaymentStatus {
        match self {
            PaymentResult::Success => PaymentStatus::Success,
            PaymentResult::Failed => PaymentStatus::Failed,
        }
    }
}

/// One attempted payment as recorded in the access ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub email: String,
    pub amount: Amount,
    pub reference: PaymentReference,
    pub status: PaymentStatus,
    pub access_granted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs needed to open a pending transaction.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub email: String,
    pub amount: Amount,
    pub reference: PaymentReference,
    pub requested_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn into_transaction(self) -> PaymentTransaction {
        PaymentTransaction {
            email: self.email,
            amount: self.amount,
            reference: self.reference,
            status: PaymentStatus::Pending,
            access_granted: false,
            created_at: self.requested_at,
            updated_at: self.requested_at,
        }
    }
}

/// Materialized access grant: at most one row per email, overwritten by any
/// later successful payment rather than accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAccess {
    pub email: String,
    pub payment_reference: PaymentReference,
    pub access_expires: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl FormAccess {
    /// A grant is live only while it is both active and unexpired; expiry
    /// needs no explicit deactivation pass.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.access_expires > now
    }
}

/// Upsert payload for [`FormAccess`].
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub email: String,
    pub payment_reference: PaymentReference,
    pub access_expires: DateTime<Utc>,
    pub granted_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Standard grant window starting at the processing instant.
    pub fn with_standard_validity(
        email: String,
        payment_reference: PaymentReference,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            payment_reference,
            access_expires: now + Duration::days(ACCESS_VALIDITY_DAYS),
            granted_at: now,
        }
    }
}
