//! In-memory mock implementations for testing.
//!
//! These mirror the semantics the PostgreSQL stores implement, including
//! the conditional-update behavior of `transition` and `reserve`, so the
//! settlement coordinator can be exercised at memory speed.

mod gateway;
mod inventory;
mod reservation_store;

pub use gateway::MockPaymentGateway;
pub use inventory::MockInventoryLedger;
pub use reservation_store::MockReservationStore;
