//! Domain types for the reservation and settlement core.
//!
//! Every payment-backed action on the platform — a donation, a shop order,
//! an event-ticket purchase — is recorded as a [`ReservationRecord`] keyed
//! by a globally unique [`PaymentReference`]. Finite-capacity resources
//! (ticket types, shop products) are tracked by [`InventoryCounter`]s that
//! are consumed only by settled records.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a reservation record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random `RecordId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RecordId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a finite-capacity resource (an event's ticket type
/// or a shop product)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Creates a new random `ResourceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ResourceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event (the gathering, not a message)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in minor currency units (e.g. cents, kobo).
///
/// Stored as a signed 64-bit integer the way the payment processor reports
/// amounts on the wire. Arithmetic is checked; amounts compared against the
/// processor's confirmed amount use exact integer equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create a `Money` from minor units
    #[must_use]
    pub const fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    /// Create a `Money` from whole major units (e.g. dollars)
    #[must_use]
    pub const fn from_major_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Get the amount in minor units
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Whether this amount is strictly positive
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checked addition, `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

// ============================================================================
// Payment reference
// ============================================================================

/// Globally unique, client-visible token correlating a reservation record
/// with the payment processor's transaction.
///
/// Format: `CW-{unix_millis}-{6 uppercase alphanumeric}`. The reference is
/// URL-safe so it survives the browser return leg as a query parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentReference(String);

const REFERENCE_SUFFIX_LEN: usize = 6;
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

impl PaymentReference {
    /// Generate a fresh reference from the current time and a random suffix.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..REFERENCE_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..REFERENCE_ALPHABET.len());
                REFERENCE_ALPHABET[idx] as char
            })
            .collect();
        Self(format!("CW-{}-{suffix}", now.timestamp_millis()))
    }

    /// Wrap an existing reference string (e.g. parsed from a callback URL).
    #[must_use]
    pub fn from_string(reference: String) -> Self {
        Self(reference)
    }

    /// Get the reference as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Payer identity
// ============================================================================

/// Who is paying. The email is required: it is forwarded to the payment
/// processor and used for record lookup; the name is display-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerIdentity {
    /// Payer's display name, if provided
    pub name: Option<String>,
    /// Payer's email address
    pub email: String,
}

impl PayerIdentity {
    /// Create a payer identity
    #[must_use]
    pub const fn new(name: Option<String>, email: String) -> Self {
        Self { name, email }
    }
}

// ============================================================================
// Reservation kind and resource reference
// ============================================================================

/// The user action a reservation record stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationKind {
    /// A free-standing donation
    Donation,
    /// A shop order
    Order,
    /// An event-ticket purchase
    TicketPurchase,
}

impl ReservationKind {
    /// Stable string form used in persistence and logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Donation => "donation",
            Self::Order => "order",
            Self::TicketPurchase => "ticket_purchase",
        }
    }

    /// Parse the persisted string form
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "donation" => Some(Self::Donation),
            "order" => Some(Self::Order),
            "ticket_purchase" => Some(Self::TicketPurchase),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a shop order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product being purchased
    pub product_id: ResourceId,
    /// Units purchased
    pub quantity: u32,
    /// Price per unit at order time
    pub unit_price: Money,
}

/// Kind-specific payload of a reservation record.
///
/// Donations are free-standing; orders and ticket purchases name the finite
/// resources that settlement must consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceRef {
    /// No resource attached (donations)
    None,
    /// Shop order payload
    Order {
        /// Line items
        lines: Vec<OrderLine>,
        /// Sum of line totals
        subtotal: Money,
        /// Shipping charge
        shipping: Money,
    },
    /// Ticket purchase payload
    Tickets {
        /// Event being attended
        event_id: EventId,
        /// Ticket type (the capacity-bearing resource)
        ticket_type_id: ResourceId,
        /// Number of tickets
        quantity: u32,
    },
}

impl ResourceRef {
    /// The inventory this reservation consumes when it settles successfully.
    ///
    /// Donations yield nothing; ticket purchases yield one demand; orders
    /// yield one demand per line.
    #[must_use]
    pub fn inventory_demands(&self) -> Vec<(ResourceId, u32)> {
        match self {
            Self::None => Vec::new(),
            Self::Order { lines, .. } => lines
                .iter()
                .map(|line| (line.product_id, line.quantity))
                .collect(),
            Self::Tickets {
                ticket_type_id,
                quantity,
                ..
            } => vec![(*ticket_type_id, *quantity)],
        }
    }
}

// ============================================================================
// Status and failure flags
// ============================================================================

/// Lifecycle status of a reservation record.
///
/// Monotonic: once `Success` or `Failed`, a record never transitions again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Created, awaiting processor confirmation
    Pending,
    /// Payment confirmed and side effects committed
    Success,
    /// Terminal failure (declined, mismatched, or sold out)
    Failed,
}

impl ReservationStatus {
    /// Whether this status is terminal
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Stable string form used in persistence and logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parse the persisted string form
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a record settled as `Failed`, persisted for manual review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Processor confirmed an amount different from the recorded one
    AmountMismatch {
        /// Amount fixed at creation
        expected: Money,
        /// Amount the processor reported
        confirmed: Money,
    },
    /// Payment succeeded but capacity ran out; a manual refund is due
    SoldOut,
    /// Processor reported the payment as failed
    Declined,
}

// ============================================================================
// Reservation record
// ============================================================================

/// Durable record of one payment-backed user action.
///
/// Created exactly once per action, transitions at most once from `Pending`
/// to a terminal state, never deleted (it is the audit trail).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// System-generated identifier, immutable
    pub id: RecordId,
    /// What kind of action this records
    pub kind: ReservationKind,
    /// Join key with the payment processor
    pub payment_reference: PaymentReference,
    /// Amount fixed at creation; must equal the verified amount
    pub amount: Money,
    /// Who is paying
    pub payer: PayerIdentity,
    /// Kind-specific payload
    pub resource_ref: ResourceRef,
    /// Current lifecycle status
    pub status: ReservationStatus,
    /// Set when the record settles as `Failed`
    pub failure_reason: Option<FailureReason>,
    /// Payment was captured but effects could not be committed
    pub refund_due: bool,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record reached a terminal status
    pub settled_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Inventory counter
// ============================================================================

/// Per-resource capacity counter.
///
/// `reserved_or_sold` counts capacity consumed by settled records only;
/// pending reservations hold nothing. Invariant:
/// `reserved_or_sold <= capacity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCounter {
    /// Resource this counter guards
    pub resource_id: ResourceId,
    /// Fixed ceiling set at creation
    pub capacity: u32,
    /// Capacity consumed by successful settlements
    pub reserved_or_sold: u32,
}

impl InventoryCounter {
    /// Create a counter for a fresh resource
    #[must_use]
    pub const fn new(resource_id: ResourceId, capacity: u32) -> Self {
        Self {
            resource_id,
            capacity,
            reserved_or_sold: 0,
        }
    }

    /// Remaining capacity, for display ("12 left")
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.reserved_or_sold)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor_units(10_000).to_string(), "100.00");
        assert_eq!(Money::from_minor_units(105).to_string(), "1.05");
        assert_eq!(Money::from_major_units(50).minor_units(), 5_000);
    }

    #[test]
    fn test_money_positivity() {
        assert!(Money::from_minor_units(1).is_positive());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::from_minor_units(-5).is_positive());
    }

    #[test]
    fn test_reference_format() {
        let reference = PaymentReference::generate(Utc::now());
        let s = reference.as_str();
        assert!(s.starts_with("CW-"));
        let parts: Vec<&str> = s.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), REFERENCE_SUFFIX_LEN);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Success,
            ReservationStatus::Failed,
        ] {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReservationStatus::parse("refunded"), None);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ReservationKind::Donation,
            ReservationKind::Order,
            ReservationKind::TicketPurchase,
        ] {
            assert_eq!(ReservationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ReservationKind::parse("subscription"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(ReservationStatus::Success.is_terminal());
        assert!(ReservationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_inventory_demands() {
        assert!(ResourceRef::None.inventory_demands().is_empty());

        let ticket_type = ResourceId::new();
        let demands = ResourceRef::Tickets {
            event_id: EventId::new(),
            ticket_type_id: ticket_type,
            quantity: 3,
        }
        .inventory_demands();
        assert_eq!(demands, vec![(ticket_type, 3)]);

        let product_a = ResourceId::new();
        let product_b = ResourceId::new();
        let demands = ResourceRef::Order {
            lines: vec![
                OrderLine {
                    product_id: product_a,
                    quantity: 2,
                    unit_price: Money::from_minor_units(1_500),
                },
                OrderLine {
                    product_id: product_b,
                    quantity: 1,
                    unit_price: Money::from_minor_units(4_000),
                },
            ],
            subtotal: Money::from_minor_units(7_000),
            shipping: Money::from_minor_units(500),
        }
        .inventory_demands();
        assert_eq!(demands, vec![(product_a, 2), (product_b, 1)]);
    }

    #[test]
    fn test_inventory_counter_remaining() {
        let mut counter = InventoryCounter::new(ResourceId::new(), 10);
        assert_eq!(counter.remaining(), 10);
        counter.reserved_or_sold = 7;
        assert_eq!(counter.remaining(), 3);
        counter.reserved_or_sold = 10;
        assert_eq!(counter.remaining(), 0);
    }

    proptest! {
        #[test]
        fn prop_references_are_url_safe(millis in 0i64..=4_102_444_800_000) {
            let now = DateTime::<Utc>::from_timestamp_millis(millis).unwrap();
            let reference = PaymentReference::generate(now);
            // Must survive a URL query parameter without encoding.
            prop_assert!(reference
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-'));
        }

        #[test]
        fn prop_counter_never_oversells(capacity in 0u32..1000, consumed in 0u32..2000) {
            let mut counter = InventoryCounter::new(ResourceId::new(), capacity);
            counter.reserved_or_sold = consumed.min(capacity);
            prop_assert!(counter.reserved_or_sold <= counter.capacity);
            prop_assert_eq!(counter.remaining(), capacity - counter.reserved_or_sold);
        }
    }
}
