//! HTTP handlers for the Causeway API.
//!
//! - `reservations` — create donations, orders, and ticket purchases;
//!   look up a record by its payment reference
//! - `callbacks` — the processor's browser return leg and server webhook,
//!   both of which trigger settlement
//! - `availability` — remaining-capacity reads and counter administration
//! - `health` — liveness probe

pub mod availability;
pub mod callbacks;
pub mod health;
pub mod reservations;
