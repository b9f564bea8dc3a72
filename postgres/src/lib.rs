//! PostgreSQL persistence for the Causeway platform.
//!
//! Implements the core storage traits against two tables:
//!
//! - `reservation_records` — append-only audit trail of payment-backed
//!   actions; rows transition at most once out of `pending` via a
//!   conditional `UPDATE`.
//! - `inventory_counters` — per-resource capacity, consumed only by
//!   successful settlements through an atomic check-and-increment.
//!
//! Migrations are embedded; run them with
//! [`PostgresReservationStore::migrate`] at startup.

pub mod inventory;
pub mod reservations;

// Re-export key types for convenience
pub use inventory::PostgresInventoryLedger;
pub use reservations::PostgresReservationStore;
