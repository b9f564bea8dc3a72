//! PostgreSQL inventory ledger.
//!
//! `reserve` runs one transaction: insert a hold keyed by
//! `(payment_reference, resource_id)`, then a conditional `UPDATE` on the
//! counter guarded by `capacity - reserved_or_sold >= quantity`. The hold
//! row's primary key makes the reserve idempotent per settlement, and
//! the conditional counter update means concurrent settlements can never
//! push `reserved_or_sold` past `capacity`.

use causeway_core::providers::InventoryLedger;
use causeway_core::types::{InventoryCounter, PaymentReference, ResourceId};
use causeway_core::{Result, SettlementError};
use sqlx::PgPool;
use std::future::Future;
use uuid::Uuid;

/// PostgreSQL inventory ledger.
#[derive(Clone)]
pub struct PostgresInventoryLedger {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Create a new ledger backed by the given pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CounterRow {
    resource_id: Uuid,
    capacity: i32,
    reserved_or_sold: i32,
}

impl TryFrom<CounterRow> for InventoryCounter {
    type Error = SettlementError;

    fn try_from(row: CounterRow) -> Result<Self> {
        let capacity = u32::try_from(row.capacity)
            .map_err(|_| SettlementError::Storage("Negative capacity".to_string()))?;
        let reserved_or_sold = u32::try_from(row.reserved_or_sold)
            .map_err(|_| SettlementError::Storage("Negative reserved_or_sold".to_string()))?;

        Ok(Self {
            resource_id: ResourceId::from_uuid(row.resource_id),
            capacity,
            reserved_or_sold,
        })
    }
}

fn quantity_param(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| SettlementError::Storage(format!("Quantity {quantity} out of range")))
}

impl InventoryLedger for PostgresInventoryLedger {
    fn create_counter(
        &self,
        resource_id: ResourceId,
        capacity: u32,
    ) -> impl Future<Output = Result<()>> + Send {
        let pool = self.pool.clone();

        async move {
            let capacity = quantity_param(capacity)?;

            sqlx::query(
                "INSERT INTO inventory_counters (resource_id, capacity) VALUES ($1, $2)",
            )
            .bind(resource_id.as_uuid())
            .bind(capacity)
            .execute(&pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return SettlementError::Storage(format!(
                            "Counter for {resource_id} already exists"
                        ));
                    }
                }
                SettlementError::Storage(format!("Failed to create counter: {e}"))
            })?;

            Ok(())
        }
    }

    fn reserve(
        &self,
        reference: &PaymentReference,
        resource_id: ResourceId,
        quantity: u32,
    ) -> impl Future<Output = Result<bool>> + Send {
        let pool = self.pool.clone();
        let reference = reference.clone();

        async move {
            let qty = quantity_param(quantity)?;

            let mut tx = pool
                .begin()
                .await
                .map_err(|e| SettlementError::Storage(format!("Failed to begin reserve: {e}")))?;

            // A conflicting insert from a concurrent duplicate of the same
            // reference blocks on the primary key until that transaction
            // resolves, then lands here with zero rows.
            let inserted = sqlx::query(
                r"
                INSERT INTO inventory_holds (payment_reference, resource_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (payment_reference, resource_id) DO NOTHING
                ",
            )
            .bind(reference.as_str())
            .bind(resource_id.as_uuid())
            .bind(qty)
            .execute(&mut *tx)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to record hold: {e}")))?;

            if inserted.rows_affected() == 0 {
                // This reference already holds the resource; nothing more
                // to consume.
                tracing::debug!(
                    reference = %reference,
                    resource_id = %resource_id,
                    "Hold already present for reference"
                );
                return Ok(false);
            }

            // Atomic check-and-increment. Zero rows means either the counter
            // does not exist or there is not enough capacity left.
            let updated = sqlx::query(
                r"
                UPDATE inventory_counters
                SET reserved_or_sold = reserved_or_sold + $2
                WHERE resource_id = $1 AND capacity - reserved_or_sold >= $2
                ",
            )
            .bind(resource_id.as_uuid())
            .bind(qty)
            .execute(&mut *tx)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to reserve: {e}")))?;

            if updated.rows_affected() == 0 {
                tx.rollback().await.map_err(|e| {
                    SettlementError::Storage(format!("Failed to roll back reserve: {e}"))
                })?;

                let exists: Option<CounterRow> = sqlx::query_as(
                    "SELECT resource_id, capacity, reserved_or_sold \
                     FROM inventory_counters WHERE resource_id = $1",
                )
                .bind(resource_id.as_uuid())
                .fetch_optional(&pool)
                .await
                .map_err(|e| SettlementError::Storage(format!("Failed to read counter: {e}")))?;

                return if exists.is_some() {
                    Err(SettlementError::InsufficientCapacity {
                        resource_id: resource_id.to_string(),
                        requested: quantity,
                    })
                } else {
                    Err(SettlementError::UnknownResource {
                        resource_id: resource_id.to_string(),
                    })
                };
            }

            tx.commit()
                .await
                .map_err(|e| SettlementError::Storage(format!("Failed to commit reserve: {e}")))?;

            tracing::debug!(
                reference = %reference,
                resource_id = %resource_id,
                quantity,
                "Inventory reserved"
            );
            Ok(true)
        }
    }

    fn release(
        &self,
        reference: &PaymentReference,
        resource_id: ResourceId,
    ) -> impl Future<Output = Result<()>> + Send {
        let pool = self.pool.clone();
        let reference = reference.clone();

        async move {
            let mut tx = pool
                .begin()
                .await
                .map_err(|e| SettlementError::Storage(format!("Failed to begin release: {e}")))?;

            let held: Option<i32> = sqlx::query_scalar(
                r"
                DELETE FROM inventory_holds
                WHERE payment_reference = $1 AND resource_id = $2
                RETURNING quantity
                ",
            )
            .bind(reference.as_str())
            .bind(resource_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to drop hold: {e}")))?;

            let Some(qty) = held else {
                // Nothing held for this (reference, resource): no-op.
                return Ok(());
            };

            // GREATEST floors the counter at zero; releasing must not
            // violate the non-negativity constraint.
            let updated = sqlx::query(
                r"
                UPDATE inventory_counters
                SET reserved_or_sold = GREATEST(reserved_or_sold - $2, 0)
                WHERE resource_id = $1
                ",
            )
            .bind(resource_id.as_uuid())
            .bind(qty)
            .execute(&mut *tx)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to release: {e}")))?;

            if updated.rows_affected() == 0 {
                return Err(SettlementError::UnknownResource {
                    resource_id: resource_id.to_string(),
                });
            }

            tx.commit()
                .await
                .map_err(|e| SettlementError::Storage(format!("Failed to commit release: {e}")))?;

            tracing::debug!(
                reference = %reference,
                resource_id = %resource_id,
                quantity = qty,
                "Inventory released"
            );
            Ok(())
        }
    }

    fn availability(
        &self,
        resource_id: ResourceId,
    ) -> impl Future<Output = Result<InventoryCounter>> + Send {
        let pool = self.pool.clone();

        async move {
            let row: Option<CounterRow> = sqlx::query_as(
                "SELECT resource_id, capacity, reserved_or_sold \
                 FROM inventory_counters WHERE resource_id = $1",
            )
            .bind(resource_id.as_uuid())
            .fetch_optional(&pool)
            .await
            .map_err(|e| SettlementError::Storage(format!("Failed to read counter: {e}")))?;

            row.ok_or_else(|| SettlementError::UnknownResource {
                resource_id: resource_id.to_string(),
            })?
            .try_into()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_row_maps() {
        let id = Uuid::new_v4();
        let counter: InventoryCounter = CounterRow {
            resource_id: id,
            capacity: 100,
            reserved_or_sold: 37,
        }
        .try_into()
        .unwrap();

        assert_eq!(counter.resource_id, ResourceId::from_uuid(id));
        assert_eq!(counter.remaining(), 63);
    }

    #[test]
    fn test_negative_row_is_rejected() {
        let err = InventoryCounter::try_from(CounterRow {
            resource_id: Uuid::new_v4(),
            capacity: -1,
            reserved_or_sold: 0,
        })
        .unwrap_err();

        assert!(matches!(err, SettlementError::Storage(_)));
    }
}
