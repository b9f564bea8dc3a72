//! PostgreSQL reservation record store.
//!
//! The terminal transition is a single conditional `UPDATE` guarded by
//! `status = 'pending'`. Under concurrent settlement attempts PostgreSQL
//! serializes the row update, so exactly one caller observes
//! `applied = true`; everyone else is told the record was already settled.

use causeway_core::providers::{ReservationStore, TransitionResult};
use causeway_core::types::{
    FailureReason, Money, PayerIdentity, PaymentReference, RecordId, ReservationKind,
    ReservationRecord, ReservationStatus, ResourceRef,
};
use causeway_core::{Result, SettlementError};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::future::Future;
use uuid::Uuid;

/// PostgreSQL reservation record store.
#[derive(Clone)]
pub struct PostgresReservationStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Create a new store backed by the given pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SettlementError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

/// Raw row shape of `reservation_records`.
#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    kind: String,
    payment_reference: String,
    amount_minor: i64,
    payer_name: Option<String>,
    payer_email: String,
    resource_ref: serde_json::Value,
    status: String,
    failure_reason: Option<serde_json::Value>,
    refund_due: bool,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for ReservationRecord {
    type Error = SettlementError;

    fn try_from(row: ReservationRow) -> Result<Self> {
        let kind = ReservationKind::parse(&row.kind)
            .ok_or_else(|| SettlementError::Storage(format!("Unknown kind '{}'", row.kind)))?;
        let status = ReservationStatus::parse(&row.status)
            .ok_or_else(|| SettlementError::Storage(format!("Unknown status '{}'", row.status)))?;
        let resource_ref: ResourceRef = serde_json::from_value(row.resource_ref)
            .map_err(|e| SettlementError::Storage(format!("Malformed resource_ref: {e}")))?;
        let failure_reason: Option<FailureReason> = row
            .failure_reason
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| SettlementError::Storage(format!("Malformed failure_reason: {e}")))?;

        Ok(Self {
            id: RecordId::from_uuid(row.id),
            kind,
            payment_reference: PaymentReference::from_string(row.payment_reference),
            amount: Money::from_minor_units(row.amount_minor),
            payer: PayerIdentity::new(row.payer_name, row.payer_email),
            resource_ref,
            status,
            failure_reason,
            refund_due: row.refund_due,
            created_at: row.created_at,
            settled_at: row.settled_at,
        })
    }
}

const RESERVATION_COLUMNS: &str = "id, kind, payment_reference, amount_minor, payer_name, \
     payer_email, resource_ref, status, failure_reason, refund_due, created_at, settled_at";

impl ReservationStore for PostgresReservationStore {
    fn create(&self, record: &ReservationRecord) -> impl Future<Output = Result<()>> + Send {
        let pool = self.pool.clone();
        let record = record.clone();

        async move {
            let resource_ref = serde_json::to_value(&record.resource_ref)
                .map_err(|e| SettlementError::Storage(format!("Failed to encode resource_ref: {e}")))?;

            sqlx::query(
                r"
                INSERT INTO reservation_records
                    (id, kind, payment_reference, amount_minor, payer_name,
                     payer_email, resource_ref, status, refund_due, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(record.id.as_uuid())
            .bind(record.kind.as_str())
            .bind(record.payment_reference.as_str())
            .bind(record.amount.minor_units())
            .bind(&record.payer.name)
            .bind(&record.payer.email)
            .bind(&resource_ref)
            .bind(record.status.as_str())
            .bind(record.refund_due)
            .bind(record.created_at)
            .execute(&pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return SettlementError::DuplicateReference;
                    }
                }
                SettlementError::Storage(format!("Failed to create reservation: {e}"))
            })?;

            Ok(())
        }
    }

    fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> impl Future<Output = Result<ReservationRecord>> + Send {
        let pool = self.pool.clone();
        let reference = reference.clone();

        async move {
            let row: Option<ReservationRow> = sqlx::query_as(&format!(
                "SELECT {RESERVATION_COLUMNS} FROM reservation_records WHERE payment_reference = $1"
            ))
            .bind(reference.as_str())
            .fetch_optional(&pool)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to find reservation: {e}")))?;

            row.ok_or_else(|| SettlementError::NotFound {
                reference: reference.as_str().to_string(),
            })?
            .try_into()
        }
    }

    fn transition(
        &self,
        reference: &PaymentReference,
        target: ReservationStatus,
        reason: Option<FailureReason>,
        refund_due: bool,
    ) -> impl Future<Output = Result<TransitionResult>> + Send {
        let pool = self.pool.clone();
        let reference = reference.clone();

        async move {
            let failure_reason = reason
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| {
                    SettlementError::Storage(format!("Failed to encode failure_reason: {e}"))
                })?;

            // The conditional UPDATE is the serialization point: only one
            // concurrent caller can move the row out of 'pending'.
            let updated: Option<ReservationRow> = sqlx::query_as(&format!(
                r"
                UPDATE reservation_records
                SET status = $2,
                    failure_reason = $3,
                    refund_due = $4,
                    settled_at = CASE WHEN $2 IN ('success', 'failed')
                                      THEN NOW() ELSE NULL END
                WHERE payment_reference = $1 AND status = 'pending'
                RETURNING {RESERVATION_COLUMNS}
                "
            ))
            .bind(reference.as_str())
            .bind(target.as_str())
            .bind(&failure_reason)
            .bind(refund_due)
            .fetch_optional(&pool)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to transition: {e}")))?;

            if let Some(row) = updated {
                tracing::debug!(
                    reference = %reference,
                    status = target.as_str(),
                    "Reservation transitioned"
                );
                return Ok(TransitionResult {
                    record: row.try_into()?,
                    applied: true,
                });
            }

            // No pending row matched: either the reference is unknown or the
            // record is already terminal. Re-read to tell the two apart.
            let row: Option<ReservationRow> = sqlx::query_as(&format!(
                "SELECT {RESERVATION_COLUMNS} FROM reservation_records WHERE payment_reference = $1"
            ))
            .bind(reference.as_str())
            .fetch_optional(&pool)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to re-read record: {e}")))?;

            let record: ReservationRecord = row
                .ok_or_else(|| SettlementError::NotFound {
                    reference: reference.as_str().to_string(),
                })?
                .try_into()?;

            if record.status == target {
                // A concurrent caller already applied this exact transition.
                Ok(TransitionResult {
                    record,
                    applied: false,
                })
            } else {
                Err(SettlementError::InvalidTransition {
                    current: record.status.as_str().to_string(),
                    requested: target.as_str().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row() -> ReservationRow {
        ReservationRow {
            id: Uuid::new_v4(),
            kind: "ticket_purchase".to_string(),
            payment_reference: "CW-1700000000000-ABC234".to_string(),
            amount_minor: 15_000,
            payer_name: Some("Ada".to_string()),
            payer_email: "ada@example.org".to_string(),
            resource_ref: json!({
                "kind": "tickets",
                "event_id": Uuid::new_v4(),
                "ticket_type_id": Uuid::new_v4(),
                "quantity": 2
            }),
            status: "pending".to_string(),
            failure_reason: None,
            refund_due: false,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    #[test]
    fn test_row_maps_to_record() {
        let record: ReservationRecord = sample_row().try_into().unwrap();
        assert_eq!(record.kind, ReservationKind::TicketPurchase);
        assert_eq!(record.status, ReservationStatus::Pending);
        assert_eq!(record.amount, Money::from_minor_units(15_000));
        assert_eq!(record.resource_ref.inventory_demands().len(), 1);
    }

    #[test]
    fn test_row_with_failure_reason() {
        let mut row = sample_row();
        row.status = "failed".to_string();
        row.failure_reason = Some(json!({ "reason": "sold_out" }));
        row.refund_due = true;

        let record: ReservationRecord = row.try_into().unwrap();
        assert_eq!(record.failure_reason, Some(FailureReason::SoldOut));
        assert!(record.refund_due);
    }

    #[test]
    fn test_row_with_unknown_status_is_rejected() {
        let mut row = sample_row();
        row.status = "refunded".to_string();

        let err = ReservationRecord::try_from(row).unwrap_err();
        assert!(matches!(err, SettlementError::Storage(_)));
    }
}
