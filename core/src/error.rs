//! Error types for reservation and settlement operations.

use thiserror::Error;

/// Result type alias for settlement operations.
pub type Result<T> = std::result::Result<T, SettlementError>;

/// Error taxonomy for the reservation/settlement subsystem.
///
/// Grouped by where the failure is handled: validation errors are rejected
/// before any record exists, gateway errors leave the record `pending` for
/// later reconciliation, and a capacity shortfall settles the record as
/// `failed` with a persisted [`crate::types::FailureReason`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
    // ═══════════════════════════════════════════════════════════
    // Validation (rejected before any record is created)
    // ═══════════════════════════════════════════════════════════

    /// Input failed validation.
    #[error("Validation failed: {reason}")]
    Validation {
        /// What was wrong with the input
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Record store
    // ═══════════════════════════════════════════════════════════

    /// No record exists for the given payment reference.
    #[error("No reservation found for reference {reference}")]
    NotFound {
        /// The unknown reference
        reference: String,
    },

    /// A freshly generated reference collided with an existing one.
    ///
    /// Astronomically unlikely; callers retry with a new reference.
    #[error("Payment reference already exists")]
    DuplicateReference,

    /// Attempted to move a terminal record to a different status.
    #[error("Record is already {current}, cannot transition to {requested}")]
    InvalidTransition {
        /// Status the record already holds
        current: String,
        /// Status the caller asked for
        requested: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Gateway
    // ═══════════════════════════════════════════════════════════

    /// The payment processor could not be reached after bounded retries.
    ///
    /// The reservation record stays `pending`; a reconciliation sweep can
    /// re-verify it later.
    #[error("Payment gateway unavailable: {reason}")]
    GatewayUnavailable {
        /// Last transport-level failure
        reason: String,
    },

    /// The processor rejected the request (bad key, malformed payload).
    #[error("Payment gateway rejected the request: {reason}")]
    GatewayRejected {
        /// Processor-reported reason
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Inventory
    // ═══════════════════════════════════════════════════════════

    /// Not enough remaining capacity to satisfy a reserve.
    #[error("Insufficient capacity for resource {resource_id}: requested {requested}")]
    InsufficientCapacity {
        /// Resource that ran out
        resource_id: String,
        /// Quantity that was requested
        requested: u32,
    },

    /// No inventory counter exists for the given resource.
    #[error("Unknown resource {resource_id}")]
    UnknownResource {
        /// The unknown resource id
        resource_id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SettlementError {
    /// Returns `true` if this error is due to invalid user input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if retrying later may succeed without operator action.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::GatewayUnavailable { .. } | Self::Storage(_))
    }
}
