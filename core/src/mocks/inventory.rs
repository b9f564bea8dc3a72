//! Mock inventory ledger for testing.

use crate::error::{Result, SettlementError};
use crate::providers::InventoryLedger;
use crate::types::{InventoryCounter, PaymentReference, ResourceId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counters plus the active holds, guarded by one lock so the hold check
/// and the counter increment happen as a single step, matching the
/// transaction the PostgreSQL ledger runs.
#[derive(Debug, Default)]
struct Ledger {
    counters: HashMap<ResourceId, InventoryCounter>,
    holds: HashMap<(String, ResourceId), u32>,
}

/// Mock inventory ledger.
#[derive(Debug, Clone, Default)]
pub struct MockInventoryLedger {
    ledger: Arc<Mutex<Ledger>>,
    reserve_calls: Arc<AtomicUsize>,
}

impl MockInventoryLedger {
    /// Create a new mock inventory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `reserve` was invoked (for idempotency assertions).
    #[must_use]
    pub fn reserve_calls(&self) -> usize {
        self.reserve_calls.load(Ordering::SeqCst)
    }

    /// Remaining capacity for a resource, `None` if unknown (for testing).
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn remaining(&self, resource_id: ResourceId) -> Option<u32> {
        self.ledger
            .lock()
            .unwrap()
            .counters
            .get(&resource_id)
            .map(InventoryCounter::remaining)
    }

    /// Number of active holds across all references (for testing).
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn active_holds(&self) -> usize {
        self.ledger.lock().unwrap().holds.len()
    }
}

impl InventoryLedger for MockInventoryLedger {
    fn create_counter(
        &self,
        resource_id: ResourceId,
        capacity: u32,
    ) -> impl Future<Output = Result<()>> + Send {
        let ledger = Arc::clone(&self.ledger);

        async move {
            let mut guard = ledger
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            if guard.counters.contains_key(&resource_id) {
                return Err(SettlementError::Storage(format!(
                    "Counter for {resource_id} already exists"
                )));
            }

            guard
                .counters
                .insert(resource_id, InventoryCounter::new(resource_id, capacity));
            Ok(())
        }
    }

    fn reserve(
        &self,
        reference: &PaymentReference,
        resource_id: ResourceId,
        quantity: u32,
    ) -> impl Future<Output = Result<bool>> + Send {
        let ledger = Arc::clone(&self.ledger);
        let calls = Arc::clone(&self.reserve_calls);
        let reference = reference.clone();

        async move {
            calls.fetch_add(1, Ordering::SeqCst);

            let mut guard = ledger
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            let key = (reference.as_str().to_string(), resource_id);
            if guard.holds.contains_key(&key) {
                // A duplicate attempt for the same reference already holds
                // these units.
                return Ok(false);
            }

            let counter = guard.counters.get_mut(&resource_id).ok_or_else(|| {
                SettlementError::UnknownResource {
                    resource_id: resource_id.to_string(),
                }
            })?;

            // Check and increment under the same lock: this is the
            // serialization point that prevents overselling.
            if counter.remaining() < quantity {
                return Err(SettlementError::InsufficientCapacity {
                    resource_id: resource_id.to_string(),
                    requested: quantity,
                });
            }

            counter.reserved_or_sold += quantity;
            guard.holds.insert(key, quantity);
            Ok(true)
        }
    }

    fn release(
        &self,
        reference: &PaymentReference,
        resource_id: ResourceId,
    ) -> impl Future<Output = Result<()>> + Send {
        let ledger = Arc::clone(&self.ledger);
        let reference = reference.clone();

        async move {
            let mut guard = ledger
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            let key = (reference.as_str().to_string(), resource_id);
            let Some(quantity) = guard.holds.remove(&key) else {
                // Nothing held: already released, or never reserved.
                return Ok(());
            };

            let counter = guard.counters.get_mut(&resource_id).ok_or_else(|| {
                SettlementError::UnknownResource {
                    resource_id: resource_id.to_string(),
                }
            })?;

            counter.reserved_or_sold = counter.reserved_or_sold.saturating_sub(quantity);
            Ok(())
        }
    }

    fn availability(
        &self,
        resource_id: ResourceId,
    ) -> impl Future<Output = Result<InventoryCounter>> + Send {
        let ledger = Arc::clone(&self.ledger);

        async move {
            let guard = ledger
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            guard
                .counters
                .get(&resource_id)
                .copied()
                .ok_or_else(|| SettlementError::UnknownResource {
                    resource_id: resource_id.to_string(),
                })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reference() -> PaymentReference {
        PaymentReference::generate(Utc::now())
    }

    #[tokio::test]
    async fn test_reserve_is_check_and_increment() {
        let ledger = MockInventoryLedger::new();
        let resource = ResourceId::new();
        ledger.create_counter(resource, 5).await.unwrap();

        assert!(ledger.reserve(&reference(), resource, 3).await.unwrap());
        assert_eq!(ledger.remaining(resource), Some(2));

        let err = ledger.reserve(&reference(), resource, 3).await.unwrap_err();
        assert!(matches!(err, SettlementError::InsufficientCapacity { .. }));
        assert_eq!(ledger.remaining(resource), Some(2));
    }

    #[tokio::test]
    async fn test_reserve_is_idempotent_per_reference() {
        let ledger = MockInventoryLedger::new();
        let resource = ResourceId::new();
        ledger.create_counter(resource, 1).await.unwrap();
        let held_by = reference();

        assert!(ledger.reserve(&held_by, resource, 1).await.unwrap());
        // Same reference again: no further consumption, no sell-out.
        assert!(!ledger.reserve(&held_by, resource, 1).await.unwrap());
        assert_eq!(ledger.remaining(resource), Some(0));

        // A different reference competes for real.
        let err = ledger.reserve(&reference(), resource, 1).await.unwrap_err();
        assert!(matches!(err, SettlementError::InsufficientCapacity { .. }));
    }

    #[tokio::test]
    async fn test_release_compensates() {
        let ledger = MockInventoryLedger::new();
        let resource = ResourceId::new();
        ledger.create_counter(resource, 5).await.unwrap();
        let held_by = reference();

        ledger.reserve(&held_by, resource, 4).await.unwrap();
        ledger.release(&held_by, resource).await.unwrap();
        assert_eq!(ledger.remaining(resource), Some(5));
        assert_eq!(ledger.active_holds(), 0);

        // Releasing again (or with nothing held) is a no-op.
        ledger.release(&held_by, resource).await.unwrap();
        ledger.release(&reference(), resource).await.unwrap();
        assert_eq!(ledger.remaining(resource), Some(5));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let ledger = MockInventoryLedger::new();
        let err = ledger
            .reserve(&reference(), ResourceId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::UnknownResource { .. }));
    }
}
