//! Mock payment gateway for testing.
//!
//! Outcomes are scripted per reference; unscripted references are rejected
//! the way a real processor rejects a transaction it has never seen.

use crate::error::{Result, SettlementError};
use crate::gateway::{InitializedPayment, PaymentGateway, VerifiedPayment};
use crate::types::{Money, PaymentReference};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock payment gateway with scripted verification outcomes.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    verifications: Arc<Mutex<HashMap<String, VerifiedPayment>>>,
    verify_unavailable: Arc<AtomicBool>,
    initialize_unavailable: Arc<AtomicBool>,
    verify_calls: Arc<AtomicUsize>,
}

impl MockPaymentGateway {
    /// Create a new mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the verification outcome for a reference.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn script_verify(&self, reference: &PaymentReference, outcome: VerifiedPayment) {
        self.verifications
            .lock()
            .unwrap()
            .insert(reference.as_str().to_string(), outcome);
    }

    /// Make `verify` fail with `GatewayUnavailable` (simulated outage).
    pub fn set_verify_unavailable(&self, unavailable: bool) {
        self.verify_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `initialize` fail with `GatewayUnavailable` (simulated outage).
    pub fn set_initialize_unavailable(&self, unavailable: bool) {
        self.initialize_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// How many times `verify` was invoked.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn initialize(
        &self,
        amount: Money,
        payer_email: &str,
        reference: &PaymentReference,
        _callback_url: &str,
    ) -> impl Future<Output = Result<InitializedPayment>> + Send {
        let unavailable = self.initialize_unavailable.load(Ordering::SeqCst);
        let reference = reference.clone();
        let payer_email = payer_email.to_string();

        async move {
            if unavailable {
                return Err(SettlementError::GatewayUnavailable {
                    reason: "simulated outage".to_string(),
                });
            }

            tracing::debug!(
                reference = %reference,
                amount = %amount,
                payer_email = %payer_email,
                "Mock payment initialized"
            );

            Ok(InitializedPayment {
                authorization_url: format!("https://checkout.example.test/pay/{reference}"),
            })
        }
    }

    fn verify(
        &self,
        reference: &PaymentReference,
    ) -> impl Future<Output = Result<VerifiedPayment>> + Send {
        let verifications = Arc::clone(&self.verifications);
        let unavailable = self.verify_unavailable.load(Ordering::SeqCst);
        let calls = Arc::clone(&self.verify_calls);
        let reference = reference.clone();

        async move {
            calls.fetch_add(1, Ordering::SeqCst);

            if unavailable {
                return Err(SettlementError::GatewayUnavailable {
                    reason: "simulated outage".to_string(),
                });
            }

            let guard = verifications
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            guard.get(reference.as_str()).copied().ok_or_else(|| {
                SettlementError::GatewayRejected {
                    reason: format!("Unknown transaction reference {reference}"),
                }
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::GatewayStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_scripted_verification() {
        let gateway = MockPaymentGateway::new();
        let reference = PaymentReference::generate(Utc::now());

        gateway.script_verify(
            &reference,
            VerifiedPayment {
                status: GatewayStatus::Success,
                amount_confirmed: Money::from_minor_units(1_000),
            },
        );

        let verified = gateway.verify(&reference).await.unwrap();
        assert_eq!(verified.status, GatewayStatus::Success);
        assert_eq!(gateway.verify_calls(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_reference_is_rejected() {
        let gateway = MockPaymentGateway::new();
        let reference = PaymentReference::generate(Utc::now());

        let err = gateway.verify(&reference).await.unwrap_err();
        assert!(matches!(err, SettlementError::GatewayRejected { .. }));
    }
}
