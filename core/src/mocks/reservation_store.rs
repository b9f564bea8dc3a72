//! Mock reservation record store for testing.

use crate::error::{Result, SettlementError};
use crate::providers::{ReservationStore, TransitionResult};
use crate::types::{FailureReason, PaymentReference, ReservationRecord, ReservationStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Mock reservation store.
///
/// Uses in-memory storage; the mutex gives `transition` the same
/// atomic-conditional-update semantics the PostgreSQL store has.
#[derive(Debug, Clone, Default)]
pub struct MockReservationStore {
    records: Arc<Mutex<HashMap<String, ReservationRecord>>>,
}

impl MockReservationStore {
    /// Create a new mock reservation store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (for testing).
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl ReservationStore for MockReservationStore {
    fn create(&self, record: &ReservationRecord) -> impl Future<Output = Result<()>> + Send {
        let records = Arc::clone(&self.records);
        let record = record.clone();

        async move {
            let mut guard = records
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            let key = record.payment_reference.as_str().to_string();
            if guard.contains_key(&key) {
                return Err(SettlementError::DuplicateReference);
            }

            guard.insert(key, record);
            Ok(())
        }
    }

    fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> impl Future<Output = Result<ReservationRecord>> + Send {
        let records = Arc::clone(&self.records);
        let reference = reference.clone();

        async move {
            let guard = records
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            guard
                .get(reference.as_str())
                .cloned()
                .ok_or_else(|| SettlementError::NotFound {
                    reference: reference.as_str().to_string(),
                })
        }
    }

    fn transition(
        &self,
        reference: &PaymentReference,
        target: ReservationStatus,
        reason: Option<FailureReason>,
        refund_due: bool,
    ) -> impl Future<Output = Result<TransitionResult>> + Send {
        let records = Arc::clone(&self.records);
        let reference = reference.clone();

        async move {
            let mut guard = records
                .lock()
                .map_err(|_| SettlementError::Storage("Mutex lock failed".to_string()))?;

            let record =
                guard
                    .get_mut(reference.as_str())
                    .ok_or_else(|| SettlementError::NotFound {
                        reference: reference.as_str().to_string(),
                    })?;

            if record.status.is_terminal() {
                if record.status == target {
                    // Idempotent no-op: duplicate callbacks are absorbed.
                    return Ok(TransitionResult {
                        record: record.clone(),
                        applied: false,
                    });
                }
                return Err(SettlementError::InvalidTransition {
                    current: record.status.as_str().to_string(),
                    requested: target.as_str().to_string(),
                });
            }

            record.status = target;
            record.failure_reason = reason;
            record.refund_due = refund_due;
            if target.is_terminal() {
                record.settled_at = Some(Utc::now());
            }

            Ok(TransitionResult {
                record: record.clone(),
                applied: true,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Money, PayerIdentity, RecordId, ReservationKind, ResourceRef};

    fn pending_record(reference: &str) -> ReservationRecord {
        ReservationRecord {
            id: RecordId::new(),
            kind: ReservationKind::Donation,
            payment_reference: PaymentReference::from_string(reference.to_string()),
            amount: Money::from_minor_units(5_000),
            payer: PayerIdentity::new(None, "donor@example.org".to_string()),
            resource_ref: ResourceRef::None,
            status: ReservationStatus::Pending,
            failure_reason: None,
            refund_due: false,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_reference() {
        let store = MockReservationStore::new();
        let record = pending_record("CW-1-AAAAAA");

        store.create(&record).await.unwrap();
        let err = store.create(&record).await.unwrap_err();
        assert_eq!(err, SettlementError::DuplicateReference);
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_transition_is_monotonic() {
        let store = MockReservationStore::new();
        let record = pending_record("CW-2-BBBBBB");
        let reference = record.payment_reference.clone();
        store.create(&record).await.unwrap();

        let result = store
            .transition(&reference, ReservationStatus::Success, None, false)
            .await
            .unwrap();
        assert!(result.applied);
        assert!(result.record.settled_at.is_some());

        // Same terminal target: absorbed.
        let result = store
            .transition(&reference, ReservationStatus::Success, None, false)
            .await
            .unwrap();
        assert!(!result.applied);

        // Different terminal target: rejected.
        let err = store
            .transition(&reference, ReservationStatus::Failed, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::InvalidTransition { .. }));
    }
}
