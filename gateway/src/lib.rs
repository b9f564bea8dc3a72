//! Paystack integration for the Causeway platform.
//!
//! Implements [`causeway_core::PaymentGateway`] against the Paystack REST
//! API, with bounded exponential backoff for transient transport failures.
//! Everything settlement-critical lives behind the core trait; this crate
//! only knows how to speak the processor's wire format.

pub mod config;
pub mod paystack;
pub mod retry;

// Re-export key types for convenience
pub use config::PaystackConfig;
pub use paystack::PaystackGateway;
pub use retry::RetryPolicy;
