//! Reservation and settlement core for the Causeway platform.
//!
//! Causeway powers a nonprofit organization's payment-backed flows:
//! donations, shop orders, and event-ticket purchases. All three share one
//! discipline, implemented here:
//!
//! 1. A durable [`types::ReservationRecord`] is created in `pending` before
//!    the payer is handed to the external processor.
//! 2. The processor's asynchronous confirmation, which may arrive late or
//!    duplicated, triggers
//!    [`settlement::SettlementCoordinator::settle`].
//! 3. Side effects that must not double-apply (crediting a donation,
//!    decrementing ticket or stock inventory) are committed exactly once,
//!    guarded by the record's monotonic terminal status.
//!
//! Storage and processor integrations are behind the [`providers`] and
//! [`gateway`] traits; `causeway-postgres` and `causeway-gateway` provide
//! the production implementations, [`mocks`] the in-memory test doubles.

pub mod config;
pub mod error;
pub mod gateway;
pub mod mocks;
pub mod providers;
pub mod settlement;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use config::SettlementConfig;
pub use error::{Result, SettlementError};
pub use gateway::{GatewayStatus, InitializedPayment, PaymentGateway, VerifiedPayment};
pub use providers::{InventoryLedger, ReservationStore, TransitionResult};
pub use settlement::{CreatedReservation, SettlementCoordinator, SettlementOutcome};
pub use types::{
    EventId, FailureReason, InventoryCounter, Money, OrderLine, PayerIdentity, PaymentReference,
    RecordId, ReservationKind, ReservationRecord, ReservationStatus, ResourceId, ResourceRef,
};
