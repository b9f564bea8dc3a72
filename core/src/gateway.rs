//! Payment gateway adapter interface.
//!
//! Abstraction over the external card/mobile-money processor. The platform
//! only consumes two operations: `initialize` (hand the payer off to the
//! processor's hosted checkout) and `verify` (ask the processor what
//! actually happened). The processor's own checkout UI is out of scope.
//!
//! A verified status is the only trusted signal — a client saying "it
//! worked" never is.

use crate::error::Result;
use crate::types::{Money, PaymentReference};
use std::future::Future;

/// Result of initializing a payment with the processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializedPayment {
    /// Hosted checkout URL the payer is redirected to
    pub authorization_url: String,
}

/// Processor-reported status of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayStatus {
    /// Payment captured
    Success,
    /// Payment failed or was abandoned at the processor
    Failed,
    /// Processor has not finished processing
    Pending,
}

/// Result of verifying a payment with the processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedPayment {
    /// Processor-reported status
    pub status: GatewayStatus,
    /// Amount the processor actually captured, in minor units
    pub amount_confirmed: Money,
}

/// Payment gateway adapter.
///
/// Implementations wrap a real processor (see `causeway-gateway`) or script
/// outcomes for tests (see [`crate::mocks::MockPaymentGateway`]).
pub trait PaymentGateway: Send + Sync {
    /// Initialize a payment and obtain the hosted checkout URL.
    ///
    /// `reference` must be the same payment reference stored on the
    /// reservation record — it is the join key between the two systems and
    /// is passed back on the browser return leg.
    ///
    /// # Errors
    ///
    /// - `GatewayUnavailable` after bounded retries on timeouts/5xx
    /// - `GatewayRejected` if the processor refuses the request
    fn initialize(
        &self,
        amount: Money,
        payer_email: &str,
        reference: &PaymentReference,
        callback_url: &str,
    ) -> impl Future<Output = Result<InitializedPayment>> + Send;

    /// Ask the processor for the authoritative status of a transaction.
    ///
    /// # Errors
    ///
    /// - `GatewayUnavailable` after bounded retries on timeouts/5xx
    /// - `GatewayRejected` if the processor refuses the request (including
    ///   references it has never seen)
    fn verify(
        &self,
        reference: &PaymentReference,
    ) -> impl Future<Output = Result<VerifiedPayment>> + Send;
}
