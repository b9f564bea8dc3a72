//! Paystack HTTP client implementing the core payment gateway contract.
//!
//! Two endpoints are used:
//!
//! - `POST /transaction/initialize` — registers the charge and returns the
//!   hosted checkout URL the payer is redirected to.
//! - `GET /transaction/verify/{reference}` — authoritative status lookup;
//!   settlement trusts this, never the browser redirect.
//!
//! Transport failures and 5xx responses are retried with backoff and then
//! surfaced as `GatewayUnavailable` so the reservation stays `pending`.
//! 4xx responses are `GatewayRejected` and never retried.

use crate::config::PaystackConfig;
use crate::retry::{RetryPolicy, retry_transient};
use causeway_core::gateway::{
    GatewayStatus, InitializedPayment, PaymentGateway, VerifiedPayment,
};
use causeway_core::{Money, PaymentReference, Result, SettlementError};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Paystack API client.
#[derive(Debug, Clone)]
pub struct PaystackGateway {
    client: reqwest::Client,
    config: PaystackConfig,
    retry: RetryPolicy,
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    /// Amount in the currency's minor units, per the Paystack API.
    amount: i64,
    reference: &'a str,
    callback_url: &'a str,
}

/// Paystack wraps every payload in `{ status, message, data }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
}

/// Map Paystack's transaction status strings onto the settlement view.
///
/// Anything that is not definitively settled ("ongoing", "queued",
/// "processing", ...) maps to `Pending` so the record is left alone.
fn map_status(status: &str) -> GatewayStatus {
    match status {
        "success" => GatewayStatus::Success,
        "failed" | "abandoned" | "reversed" => GatewayStatus::Failed,
        _ => GatewayStatus::Pending,
    }
}

impl PaystackGateway {
    /// Create a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayUnavailable` if the underlying HTTP client cannot be
    /// constructed (e.g. no TLS backend).
    pub fn new(config: PaystackConfig) -> Result<Self> {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Create a client with an explicit retry policy.
    ///
    /// # Errors
    ///
    /// Returns `GatewayUnavailable` if the underlying HTTP client cannot be
    /// constructed.
    pub fn with_retry(config: PaystackConfig, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SettlementError::GatewayUnavailable {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    async fn initialize_once(
        &self,
        amount: Money,
        payer_email: &str,
        reference: &PaymentReference,
        callback_url: &str,
    ) -> Result<InitializedPayment> {
        let body = InitializeRequest {
            email: payer_email,
            amount: amount.minor_units(),
            reference: reference.as_str(),
            callback_url,
        };

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let data: InitializeData = unwrap_envelope(response).await?;

        tracing::info!(
            reference = %reference,
            amount = %amount,
            "Payment initialized with processor"
        );

        Ok(InitializedPayment {
            authorization_url: data.authorization_url,
        })
    }

    async fn verify_once(&self, reference: &PaymentReference) -> Result<VerifiedPayment> {
        let response = self
            .client
            .get(format!(
                "{}/transaction/verify/{}",
                self.config.base_url,
                reference.as_str()
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        let data: VerifyData = unwrap_envelope(response).await?;
        let status = map_status(&data.status);

        tracing::debug!(
            reference = %reference,
            processor_status = %data.status,
            amount = data.amount,
            "Transaction verified with processor"
        );

        Ok(VerifiedPayment {
            status,
            amount_confirmed: Money::from_minor_units(data.amount),
        })
    }
}

impl PaymentGateway for PaystackGateway {
    fn initialize(
        &self,
        amount: Money,
        payer_email: &str,
        reference: &PaymentReference,
        callback_url: &str,
    ) -> impl Future<Output = Result<InitializedPayment>> + Send {
        async move {
            retry_transient(&self.retry, || {
                self.initialize_once(amount, payer_email, reference, callback_url)
            })
            .await
        }
    }

    fn verify(
        &self,
        reference: &PaymentReference,
    ) -> impl Future<Output = Result<VerifiedPayment>> + Send {
        async move { retry_transient(&self.retry, || self.verify_once(reference)).await }
    }
}

fn transport_error(err: reqwest::Error) -> SettlementError {
    SettlementError::GatewayUnavailable {
        reason: err.to_string(),
    }
}

/// Check the HTTP status, then unwrap Paystack's response envelope.
async fn unwrap_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let http_status = response.status();

    if http_status.is_server_error() {
        return Err(SettlementError::GatewayUnavailable {
            reason: format!("Processor returned {http_status}"),
        });
    }

    if !http_status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| http_status.to_string());
        return Err(SettlementError::GatewayRejected {
            reason: format!("Processor returned {http_status}: {message}"),
        });
    }

    let envelope: Envelope<T> =
        response
            .json()
            .await
            .map_err(|e| SettlementError::GatewayRejected {
                reason: format!("Malformed processor response: {e}"),
            })?;

    if !envelope.status {
        return Err(SettlementError::GatewayRejected {
            reason: envelope.message,
        });
    }

    envelope.data.ok_or_else(|| SettlementError::GatewayRejected {
        reason: "Processor response missing data".to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status("success"), GatewayStatus::Success);
        assert_eq!(map_status("failed"), GatewayStatus::Failed);
        assert_eq!(map_status("abandoned"), GatewayStatus::Failed);
        assert_eq!(map_status("reversed"), GatewayStatus::Failed);
        assert_eq!(map_status("ongoing"), GatewayStatus::Pending);
        assert_eq!(map_status("queued"), GatewayStatus::Pending);
    }

    #[test]
    fn test_initialize_request_wire_shape() {
        let body = InitializeRequest {
            email: "donor@example.org",
            amount: 50_000,
            reference: "CW-1700000000000-ABC234",
            callback_url: "https://app.example.org/payments/callback",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["email"], "donor@example.org");
        assert_eq!(json["amount"], 50_000);
        assert_eq!(json["reference"], "CW-1700000000000-ABC234");
    }

    #[test]
    fn test_envelope_parsing() {
        let raw = r#"{
            "status": true,
            "message": "Verification successful",
            "data": { "status": "success", "amount": 50000, "currency": "NGN" }
        }"#;

        let envelope: Envelope<VerifyData> = serde_json::from_str(raw).unwrap();
        assert!(envelope.status);
        let data = envelope.data.unwrap();
        assert_eq!(map_status(&data.status), GatewayStatus::Success);
        assert_eq!(data.amount, 50_000);
    }

    #[test]
    fn test_envelope_without_data() {
        let raw = r#"{ "status": false, "message": "Invalid key" }"#;
        let envelope: Envelope<VerifyData> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.status);
        assert!(envelope.data.is_none());
    }
}
