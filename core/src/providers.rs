//! Storage provider traits for the settlement core.
//!
//! These traits abstract over the durable stores: the reservation record
//! store and the per-resource inventory ledger. PostgreSQL implementations
//! live in `causeway-postgres`; in-memory mocks for tests live in
//! [`crate::mocks`].
//!
//! # Concurrency contract
//!
//! Multiple server instances run concurrently, so the per-key serialization
//! points — a record's status and a resource's consumed count — must be
//! implemented as single atomic conditional updates at the persistence
//! layer, never as a read followed by a separate write.

use crate::error::Result;
use crate::types::{
    FailureReason, InventoryCounter, PaymentReference, ReservationRecord, ReservationStatus,
    ResourceId,
};
use std::future::Future;

/// Result of a status transition attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionResult {
    /// The record after the attempt
    pub record: ReservationRecord,
    /// `true` if this call performed the transition; `false` if the record
    /// was already at the target terminal status (idempotent no-op)
    pub applied: bool,
}

/// Durable store of reservation records.
///
/// Records are append-then-settle: created once in `pending`, transitioned
/// at most once to a terminal status, never deleted.
pub trait ReservationStore: Send + Sync {
    /// Persist a freshly created `pending` record.
    ///
    /// # Errors
    ///
    /// - `DuplicateReference` if the generated reference collides with an
    ///   existing record (caller retries with a new reference)
    /// - `Storage` if the store is unreachable
    fn create(
        &self,
        record: &ReservationRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Look up a record by its payment reference.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record carries this reference
    /// - `Storage` if the store is unreachable
    fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> impl Future<Output = Result<ReservationRecord>> + Send;

    /// Transition a record from `pending` to a terminal status.
    ///
    /// Must execute as one atomic conditional update: the transition applies
    /// only if the record is still `pending`. When the record is already at
    /// `target` the call is an idempotent no-op (`applied == false`) — this
    /// is what makes duplicate callbacks safe.
    ///
    /// `reason` and `refund_due` are persisted alongside a `Failed` target
    /// for manual review; the store stamps `settled_at`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the record is terminal and `target` differs
    /// - `NotFound` if no record carries this reference
    /// - `Storage` if the store is unreachable
    fn transition(
        &self,
        reference: &PaymentReference,
        target: ReservationStatus,
        reason: Option<FailureReason>,
        refund_due: bool,
    ) -> impl Future<Output = Result<TransitionResult>> + Send;
}

/// Per-resource capacity ledger.
///
/// Counters are mutated only by the settlement coordinator, and only at
/// confirmed-settlement time — pending reservations never hold capacity.
pub trait InventoryLedger: Send + Sync {
    /// Create the counter for a new finite-capacity resource.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the counter already exists or the store is
    /// unreachable.
    fn create_counter(
        &self,
        resource_id: ResourceId,
        capacity: u32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Atomically consume `quantity` units of capacity, recorded as a hold
    /// keyed by `(reference, resource_id)`.
    ///
    /// The capacity check and the increment are one serializable operation
    /// against the store: `reserved_or_sold` can never exceed `capacity`
    /// even under concurrent callers. Keying the hold by reference makes
    /// the call idempotent per settlement: when the reference already holds
    /// this resource (a duplicate callback racing the original), the call
    /// consumes nothing and returns `Ok(false)`. `Ok(true)` means this call
    /// created the hold.
    ///
    /// # Errors
    ///
    /// - `InsufficientCapacity` if fewer than `quantity` units remain
    /// - `UnknownResource` if no counter exists for `resource_id`
    /// - `Storage` if the store is unreachable
    fn reserve(
        &self,
        reference: &PaymentReference,
        resource_id: ResourceId,
        quantity: u32,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Compensating release: drop the reference's hold on `resource_id`,
    /// returning the held quantity to capacity. Used only when a settlement
    /// that reserved inventory ends up `failed`.
    ///
    /// A no-op when the reference holds nothing for `resource_id`, so
    /// concurrent rollback attempts cannot double-release.
    ///
    /// # Errors
    ///
    /// - `UnknownResource` if a hold existed but its counter does not
    /// - `Storage` if the store is unreachable
    fn release(
        &self,
        reference: &PaymentReference,
        resource_id: ResourceId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remaining capacity for display purposes.
    ///
    /// Read-only and tolerant of brief staleness; overselling is prevented
    /// by [`InventoryLedger::reserve`], not by this read.
    ///
    /// # Errors
    ///
    /// - `UnknownResource` if no counter exists for `resource_id`
    /// - `Storage` if the store is unreachable
    fn availability(
        &self,
        resource_id: ResourceId,
    ) -> impl Future<Output = Result<InventoryCounter>> + Send;
}
