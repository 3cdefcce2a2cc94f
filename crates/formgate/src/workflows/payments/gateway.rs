use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::domain::{Amount, PaymentReference};
use crate::config::PaymentProviderConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Processor status string that counts as a settled charge. Anything else on
/// the verify path is either failed or still pending.
const SUCCESS_STATUS: &str = "success";

/// Inputs for one payment initialization round-trip.
#[derive(Debug, Clone)]
pub struct InitializeRequest {
    pub email: String,
    pub amount: Amount,
    pub reference: PaymentReference,
    pub callback_url: String,
}

/// Successful initialization: where to send the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedPayment {
    pub authorization_url: String,
}

/// Verification verdict reported by the processor, with the raw status kept
/// for logging and failure pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    Failed { raw_status: String },
    Pending { raw_status: String },
}

/// Errors talking to the payment processor. `Transport` is retryable and must
/// be surfaced to callers as distinct from a processor-side rejection.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment processor unreachable: {0}")]
    Transport(String),
    #[error("payment processor rejected the request: {message}")]
    Rejected { message: String },
    #[error("payment processor returned an unexpected payload: {0}")]
    UnexpectedPayload(String),
}

/// Seam to the external payment processor so services and tests can run
/// against fakes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError>;

    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<VerificationStatus, GatewayError>;
}

/// Paystack-backed gateway client. Owns transport details only: request
/// serialization, bearer auth, the 30 second timeout, and response decoding.
pub struct PaystackGateway {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl PaystackGateway {
    pub fn new(config: &PaymentProviderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: u64,
    reference: &'a str,
    callback_url: &'a str,
    metadata: Metadata,
}

#[derive(Debug, Serialize)]
struct Metadata {
    custom_fields: Vec<CustomField>,
}

#[derive(Debug, Serialize)]
struct CustomField {
    display_name: &'static str,
    variable_name: &'static str,
    value: &'static str,
}

fn application_fee_metadata() -> Metadata {
    Metadata {
        custom_fields: vec![CustomField {
            display_name: "Application Fee",
            variable_name: "application_fee",
            value: "Job Application Form Access",
        }],
    }
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: bool,
    message: Option<String>,
    data: Option<InitializeData>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    message: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

fn rejection_message(message: Option<String>) -> String {
    message.unwrap_or_else(|| "payment request was not accepted".to_string())
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError> {
        let url = format!("{}/transaction/initialize", self.base_url);
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount.to_minor_units(),
            reference: &request.reference.0,
            callback_url: &request.callback_url,
            metadata: application_fee_metadata(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let payload: InitializeResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::UnexpectedPayload(err.to_string()))?;

        if !payload.status {
            return Err(GatewayError::Rejected {
                message: rejection_message(payload.message),
            });
        }

        let data = payload.data.ok_or_else(|| {
            GatewayError::UnexpectedPayload("initialize response missing data".to_string())
        })?;

        Ok(InitializedPayment {
            authorization_url: data.authorization_url,
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<VerificationStatus, GatewayError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference.0);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        let payload: VerifyResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::UnexpectedPayload(err.to_string()))?;

        if !payload.status {
            return Err(GatewayError::Rejected {
                message: rejection_message(payload.message),
            });
        }

        let data = payload.data.ok_or_else(|| {
            GatewayError::UnexpectedPayload("verify response missing data".to_string())
        })?;

        Ok(match data.status.as_str() {
            SUCCESS_STATUS => VerificationStatus::Success,
            "pending" | "ongoing" => VerificationStatus::Pending {
                raw_status: data.status,
            },
            _ => VerificationStatus::Failed {
                raw_status: data.status,
            },
        })
    }
}
