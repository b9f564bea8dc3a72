//! Settlement coordinator: the reservation/settlement state machine.
//!
//! One coordinator drives the whole payment-backed flow shared by
//! donations, shop orders, and ticket purchases:
//!
//! ```text
//! create_reservation          settle (callback/webhook, any number of times)
//! ┌─────────────────┐   ┌──────────────────────────────────────────────┐
//! │ validate input  │   │ load record ── terminal? return as-is        │
//! │ persist pending │   │ verify with processor (never trust client)   │
//! │ gateway init    │   │ success + amount ok: reserve inventory,      │
//! │ → checkout URL  │   │   flip pending → success (conditional)       │
//! └─────────────────┘   │ failed / mismatch / sold out: flip → failed  │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! The terminal-state guard plus the conditional store transition make
//! `settle` idempotent: side effects are observable exactly once per
//! reference no matter how many times the processor retries its callback.

use crate::config::SettlementConfig;
use crate::error::{Result, SettlementError};
use crate::gateway::{GatewayStatus, PaymentGateway};
use crate::providers::{InventoryLedger, ReservationStore};
use crate::types::{
    FailureReason, InventoryCounter, Money, PayerIdentity, PaymentReference, RecordId,
    ReservationKind, ReservationRecord, ReservationStatus, ResourceId, ResourceRef,
};
use crate::utils::is_valid_email;
use chrono::Utc;

/// Result of creating a reservation: the durable pending record plus the
/// processor's hosted checkout URL.
#[derive(Clone, Debug)]
pub struct CreatedReservation {
    /// The persisted `pending` record
    pub record: ReservationRecord,
    /// Where to send the payer
    pub authorization_url: String,
}

/// Result of a settlement attempt.
#[derive(Clone, Debug)]
pub struct SettlementOutcome {
    /// The record after this attempt
    pub record: ReservationRecord,
    /// `true` if this call performed the terminal transition; `false` for
    /// absorbed duplicates and still-pending verifications
    pub newly_settled: bool,
}

/// Coordinates reservation records, the inventory ledger, and the payment
/// gateway into an exactly-once settlement flow.
#[derive(Clone, Debug)]
pub struct SettlementCoordinator<S, L, G> {
    records: S,
    inventory: L,
    gateway: G,
    config: SettlementConfig,
}

impl<S, L, G> SettlementCoordinator<S, L, G>
where
    S: ReservationStore,
    L: InventoryLedger,
    G: PaymentGateway,
{
    /// Create a new coordinator.
    #[must_use]
    pub const fn new(records: S, inventory: L, gateway: G, config: SettlementConfig) -> Self {
        Self {
            records,
            inventory,
            gateway,
            config,
        }
    }

    // ========================================================================
    // Reservation creation
    // ========================================================================

    /// Create a `pending` reservation and initialize payment.
    ///
    /// The record is durable before the processor is contacted, so a payer
    /// who never completes checkout leaves an auditable `pending` record
    /// and nothing else — no capacity is held by unpaid attempts.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount, bad email, zero or
    ///   excessive quantities, or an order whose amount does not equal
    ///   subtotal + shipping
    /// - `GatewayUnavailable` / `GatewayRejected` if payment initialization
    ///   fails (the pending record remains for reconciliation)
    /// - `DuplicateReference` only if every retry collided
    pub async fn create_reservation(
        &self,
        kind: ReservationKind,
        amount: Money,
        payer: PayerIdentity,
        resource_ref: ResourceRef,
    ) -> Result<CreatedReservation> {
        Self::validate_amount(amount)?;
        Self::validate_payer(&payer)?;
        self.validate_resource_ref(kind, amount, &resource_ref)?;

        let record = self.persist_with_fresh_reference(kind, amount, payer, resource_ref).await?;

        tracing::info!(
            reference = %record.payment_reference,
            kind = %record.kind,
            amount = %record.amount,
            "Reservation created"
        );

        let initialized = self
            .gateway
            .initialize(
                record.amount,
                &record.payer.email,
                &record.payment_reference,
                &self.config.callback_url,
            )
            .await?;

        Ok(CreatedReservation {
            record,
            authorization_url: initialized.authorization_url,
        })
    }

    /// Persist a new pending record, regenerating the reference on the
    /// astronomically unlikely collision.
    async fn persist_with_fresh_reference(
        &self,
        kind: ReservationKind,
        amount: Money,
        payer: PayerIdentity,
        resource_ref: ResourceRef,
    ) -> Result<ReservationRecord> {
        let mut attempts = 0;
        loop {
            let now = Utc::now();
            let record = ReservationRecord {
                id: RecordId::new(),
                kind,
                payment_reference: PaymentReference::generate(now),
                amount,
                payer: payer.clone(),
                resource_ref: resource_ref.clone(),
                status: ReservationStatus::Pending,
                failure_reason: None,
                refund_due: false,
                created_at: now,
                settled_at: None,
            };

            match self.records.create(&record).await {
                Ok(()) => return Ok(record),
                Err(SettlementError::DuplicateReference) if attempts < self.config.reference_retries => {
                    attempts += 1;
                    tracing::warn!(
                        attempts,
                        "Payment reference collision, regenerating"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ========================================================================
    // Settlement
    // ========================================================================

    /// Settle a reservation after the payer returns or a webhook fires.
    ///
    /// Safe to call any number of times for the same reference: duplicate
    /// invocations after a terminal state are absorbed as no-ops returning
    /// the existing state.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown reference (never settle one)
    /// - `GatewayUnavailable` if verification cannot complete — the record
    ///   stays `pending` and a later attempt may succeed
    /// - `Storage` if a store operation fails mid-flight; any inventory
    ///   reserved by this attempt is released first
    pub async fn settle(&self, reference: &PaymentReference) -> Result<SettlementOutcome> {
        let record = self.records.find_by_reference(reference).await?;

        // Idempotency guard: the primary defense against duplicate
        // callbacks double-crediting a donation or double-decrementing
        // stock.
        if record.status.is_terminal() {
            tracing::debug!(
                reference = %reference,
                status = %record.status,
                "Duplicate settlement absorbed"
            );
            return Ok(SettlementOutcome {
                record,
                newly_settled: false,
            });
        }

        let verified = self.gateway.verify(reference).await?;

        match verified.status {
            GatewayStatus::Pending => {
                // Processor still working; leave the record pending.
                tracing::debug!(reference = %reference, "Verification still pending");
                Ok(SettlementOutcome {
                    record,
                    newly_settled: false,
                })
            }
            GatewayStatus::Failed => {
                self.settle_failed(reference, FailureReason::Declined, false).await
            }
            GatewayStatus::Success => {
                if verified.amount_confirmed == record.amount {
                    self.commit_success(&record).await
                } else {
                    tracing::warn!(
                        reference = %reference,
                        expected = %record.amount,
                        confirmed = %verified.amount_confirmed,
                        "Verified amount does not match record, settling as failed"
                    );
                    self.settle_failed(
                        reference,
                        FailureReason::AmountMismatch {
                            expected: record.amount,
                            confirmed: verified.amount_confirmed,
                        },
                        false,
                    )
                    .await
                }
            }
        }
    }

    /// Commit a verified-success settlement: consume inventory, then flip
    /// the record to `success` with a conditional transition.
    ///
    /// Inventory holds are keyed by reference, so a duplicate callback
    /// racing this one reuses the holds the first attempt placed instead of
    /// competing with it for the remaining units. Whichever attempt wins
    /// the conditional transition, the holds back the committed settlement;
    /// they are only released when the record actually ends `failed`.
    async fn commit_success(&self, record: &ReservationRecord) -> Result<SettlementOutcome> {
        let reference = &record.payment_reference;
        let demands = record.resource_ref.inventory_demands();
        // Holds created by this attempt, as opposed to holds a concurrent
        // duplicate of the same reference already placed.
        let mut created: Vec<ResourceId> = Vec::with_capacity(demands.len());

        for (resource_id, quantity) in demands.iter().copied() {
            match self.inventory.reserve(reference, resource_id, quantity).await {
                Ok(true) => created.push(resource_id),
                Ok(false) => {
                    tracing::debug!(
                        reference = %reference,
                        resource_id = %resource_id,
                        "Inventory already held for this reference"
                    );
                }
                Err(SettlementError::InsufficientCapacity { .. }) => {
                    // Payment succeeded but the capacity is gone: settle as
                    // failed with a refund flagged for manual handling.
                    tracing::warn!(
                        reference = %reference,
                        resource_id = %resource_id,
                        quantity,
                        "Sold out after successful payment, refund due"
                    );
                    let outcome = self
                        .settle_failed(reference, FailureReason::SoldOut, true)
                        .await?;
                    // Only roll back if the record really ended failed; a
                    // duplicate may have committed success in the meantime,
                    // and its holds must stand.
                    if outcome.record.status == ReservationStatus::Failed {
                        self.release_all(reference, &created).await;
                    }
                    return Ok(outcome);
                }
                Err(e) => {
                    self.release_all(reference, &created).await;
                    return Err(e);
                }
            }
        }

        match self
            .records
            .transition(reference, ReservationStatus::Success, None, false)
            .await
        {
            Ok(result) => {
                if result.applied {
                    tracing::info!(
                        reference = %reference,
                        kind = %record.kind,
                        amount = %record.amount,
                        "Settlement committed"
                    );
                }
                // applied == false means a duplicate of this reference
                // committed the same settlement; the holds back it, so
                // there is nothing to undo.
                Ok(SettlementOutcome {
                    record: result.record,
                    newly_settled: result.applied,
                })
            }
            Err(SettlementError::InvalidTransition { .. }) => {
                // The record settled as failed elsewhere (a decline or
                // mismatch was recorded first). No capacity may stay
                // consumed for a failed record: drop every hold placed
                // under this reference and report the state that won.
                let all: Vec<ResourceId> = demands.iter().map(|(r, _)| *r).collect();
                self.release_all(reference, &all).await;
                let record = self.records.find_by_reference(reference).await?;
                Ok(SettlementOutcome {
                    record,
                    newly_settled: false,
                })
            }
            Err(e) => {
                self.release_all(reference, &created).await;
                Err(e)
            }
        }
    }

    /// Flip the record to `failed` with the given reason. Duplicate
    /// failures are absorbed the same way duplicate successes are.
    async fn settle_failed(
        &self,
        reference: &PaymentReference,
        reason: FailureReason,
        refund_due: bool,
    ) -> Result<SettlementOutcome> {
        match self
            .records
            .transition(reference, ReservationStatus::Failed, Some(reason), refund_due)
            .await
        {
            Ok(result) => {
                if result.applied {
                    tracing::info!(
                        reference = %reference,
                        reason = ?reason,
                        refund_due,
                        "Settlement failed"
                    );
                }
                Ok(SettlementOutcome {
                    record: result.record,
                    newly_settled: result.applied,
                })
            }
            Err(SettlementError::InvalidTransition { .. }) => {
                let record = self.records.find_by_reference(reference).await?;
                Ok(SettlementOutcome {
                    record,
                    newly_settled: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Compensating release for the given holds, in reverse reserve order.
    ///
    /// Release failures are logged, not propagated: the settlement outcome
    /// is already decided and a stuck release is an operator concern.
    async fn release_all(&self, reference: &PaymentReference, resources: &[ResourceId]) {
        for resource_id in resources.iter().rev() {
            if let Err(e) = self.inventory.release(reference, *resource_id).await {
                tracing::error!(
                    reference = %reference,
                    resource_id = %resource_id,
                    error = %e,
                    "Failed to release reserved inventory"
                );
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up a reservation record by reference (for status pages).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown references.
    pub async fn find_reservation(
        &self,
        reference: &PaymentReference,
    ) -> Result<ReservationRecord> {
        self.records.find_by_reference(reference).await
    }

    /// Remaining capacity for a resource, for display.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if no counter exists.
    pub async fn availability(&self, resource_id: ResourceId) -> Result<InventoryCounter> {
        self.inventory.availability(resource_id).await
    }

    /// Register the inventory counter for a new finite-capacity resource.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a counter already exists for `resource_id`.
    pub async fn create_resource(&self, resource_id: ResourceId, capacity: u32) -> Result<()> {
        self.inventory.create_counter(resource_id, capacity).await?;
        tracing::info!(%resource_id, capacity, "Inventory counter created");
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn validate_amount(amount: Money) -> Result<()> {
        if amount.is_positive() {
            Ok(())
        } else {
            Err(SettlementError::Validation {
                reason: format!("Amount must be positive, got {amount}"),
            })
        }
    }

    fn validate_payer(payer: &PayerIdentity) -> Result<()> {
        if is_valid_email(&payer.email) {
            Ok(())
        } else {
            Err(SettlementError::Validation {
                reason: format!("Invalid email address: {}", payer.email),
            })
        }
    }

    fn validate_resource_ref(
        &self,
        kind: ReservationKind,
        amount: Money,
        resource_ref: &ResourceRef,
    ) -> Result<()> {
        match (kind, resource_ref) {
            (ReservationKind::Donation, ResourceRef::None) => Ok(()),
            (ReservationKind::TicketPurchase, ResourceRef::Tickets { quantity, .. }) => {
                self.validate_quantity(*quantity)
            }
            (
                ReservationKind::Order,
                ResourceRef::Order {
                    lines,
                    subtotal,
                    shipping,
                },
            ) => {
                if lines.is_empty() {
                    return Err(SettlementError::Validation {
                        reason: "Order must contain at least one line".to_string(),
                    });
                }
                for line in lines {
                    self.validate_quantity(line.quantity)?;
                }
                let total = subtotal.checked_add(*shipping).ok_or_else(|| {
                    SettlementError::Validation {
                        reason: "Order total overflows".to_string(),
                    }
                })?;
                if total != amount {
                    return Err(SettlementError::Validation {
                        reason: format!(
                            "Order amount {amount} does not equal subtotal {subtotal} + shipping {shipping}"
                        ),
                    });
                }
                Ok(())
            }
            (kind, _) => Err(SettlementError::Validation {
                reason: format!("Resource reference does not match reservation kind {kind}"),
            }),
        }
    }

    fn validate_quantity(&self, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(SettlementError::Validation {
                reason: "Quantity must be greater than zero".to_string(),
            });
        }
        if quantity > self.config.max_quantity {
            return Err(SettlementError::Validation {
                reason: format!(
                    "Cannot reserve more than {} units at once (requested: {quantity})",
                    self.config.max_quantity
                ),
            });
        }
        Ok(())
    }
}
