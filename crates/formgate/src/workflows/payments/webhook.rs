use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// The only processor event this system acts on.
pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// Validates the secret-keyed HMAC-SHA512 signature Paystack sends over the
/// raw request body. Verification happens before any JSON parsing, and the
/// comparison is constant time via `Mac::verify_slice`.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(claimed) = hex::decode(signature.trim()) else {
            return false;
        };

        let mut mac = HmacSha512::new_from_slice(self.secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(body);
        mac.verify_slice(&claimed).is_ok()
    }

    /// Hex digest for an outbound body; the processor computes the same
    /// value, which is also how test fixtures forge valid deliveries.
    pub fn signature(&self, body: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(self.secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Parsed webhook body, split into the one watched event and everything else
/// so unrelated event shapes never fail deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPayload {
    ChargeSucceeded(ChargeData),
    Other { event: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChargeData {
    pub reference: String,
    /// Settled amount in kobo, converted back by dividing by 100.
    pub amount: u64,
    pub customer: ChargeCustomer,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChargeCustomer {
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub fn parse_payload(body: &[u8]) -> Result<WebhookPayload, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.event != CHARGE_SUCCESS_EVENT {
        return Ok(WebhookPayload::Other {
            event: envelope.event,
        });
    }

    let data: ChargeData = serde_json::from_value(envelope.data)?;
    Ok(WebhookPayload::ChargeSucceeded(data))
}
