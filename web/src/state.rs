//! Shared application state for web handlers.

use causeway_core::{InventoryLedger, PaymentGateway, ReservationStore, SettlementCoordinator};
use std::sync::Arc;

/// Shared state handed to every handler.
///
/// Generic over the storage and gateway implementations so the same router
/// serves production (PostgreSQL + Paystack) and tests (in-memory mocks).
pub struct AppState<S, L, G> {
    /// The settlement coordinator.
    pub coordinator: Arc<SettlementCoordinator<S, L, G>>,
}

impl<S, L, G> AppState<S, L, G>
where
    S: ReservationStore,
    L: InventoryLedger,
    G: PaymentGateway,
{
    /// Wrap a coordinator for sharing across handlers.
    #[must_use]
    pub fn new(coordinator: SettlementCoordinator<S, L, G>) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }
}

// Manual impl: the Arc is cheap to clone regardless of the inner types.
impl<S, L, G> Clone for AppState<S, L, G> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}
