//! HTTP API for the Causeway platform.
//!
//! Exposes the reservation/settlement core over axum:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/donations` | Create a donation reservation |
//! | `POST /api/orders` | Create a shop order reservation |
//! | `POST /api/tickets` | Create an event-ticket reservation |
//! | `GET /api/reservations/:reference` | Record lookup for status pages |
//! | `GET /api/availability/:resource_id` | Remaining capacity |
//! | `POST /api/admin/resources` | Register an inventory counter |
//! | `GET /payments/callback` | Processor browser return leg (settles) |
//! | `POST /payments/webhook` | Processor server webhook (settles) |
//! | `GET /health` | Liveness probe |

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use causeway_core::{InventoryLedger, PaymentGateway, ReservationStore};

/// Build the application router over the given state.
///
/// Generic over the storage and gateway implementations so tests can mount
/// the same routes on in-memory mocks.
pub fn router<S, L, G>(state: AppState<S, L, G>) -> Router
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/donations", post(handlers::reservations::create_donation))
        .route("/api/orders", post(handlers::reservations::create_order))
        .route(
            "/api/tickets",
            post(handlers::reservations::create_ticket_purchase),
        )
        .route(
            "/api/reservations/:reference",
            get(handlers::reservations::get_reservation),
        )
        .route(
            "/api/availability/:resource_id",
            get(handlers::availability::get_availability),
        )
        .route(
            "/api/admin/resources",
            post(handlers::availability::create_resource),
        )
        .route(
            "/payments/callback",
            get(handlers::callbacks::payment_callback),
        )
        .route(
            "/payments/webhook",
            post(handlers::callbacks::payment_webhook),
        )
        .with_state(state)
}
