//! Reservation creation and lookup endpoints.
//!
//! - POST /api/donations — create a donation reservation
//! - POST /api/orders — create a shop order reservation
//! - POST /api/tickets — create an event-ticket reservation
//! - GET /api/reservations/:reference — look up a record (status pages)
//!
//! All three create endpoints follow the same shape: validate, persist a
//! `pending` record, initialize the payment, and hand back the processor's
//! hosted checkout URL. Amounts are minor currency units throughout.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use causeway_core::types::{
    EventId, FailureReason, Money, OrderLine, PayerIdentity, PaymentReference, ReservationKind,
    ReservationRecord, ResourceId, ResourceRef,
};
use causeway_core::{InventoryLedger, PaymentGateway, ReservationStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a donation.
#[derive(Debug, Deserialize)]
pub struct DonationRequest {
    /// Donor's display name
    pub name: Option<String>,
    /// Donor's email (forwarded to the processor)
    pub email: String,
    /// Donation amount in minor units
    pub amount_minor: i64,
}

/// One line of an order request.
#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    /// Product being purchased
    pub product_id: Uuid,
    /// Units purchased
    pub quantity: u32,
    /// Price per unit in minor units
    pub unit_price_minor: i64,
}

/// Request to create a shop order.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    /// Buyer's display name
    pub name: Option<String>,
    /// Buyer's email
    pub email: String,
    /// Total charged, in minor units (must equal subtotal + shipping)
    pub amount_minor: i64,
    /// Line items
    pub lines: Vec<OrderLineRequest>,
    /// Sum of line totals in minor units
    pub subtotal_minor: i64,
    /// Shipping charge in minor units
    pub shipping_minor: i64,
}

/// Request to create an event-ticket purchase.
#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    /// Attendee's display name
    pub name: Option<String>,
    /// Attendee's email
    pub email: String,
    /// Total charged, in minor units
    pub amount_minor: i64,
    /// Event being attended
    pub event_id: Uuid,
    /// Ticket type (the capacity-bearing resource)
    pub ticket_type_id: Uuid,
    /// Number of tickets
    pub quantity: u32,
}

/// Response after creating any reservation.
#[derive(Debug, Serialize)]
pub struct ReservationCreatedResponse {
    /// Payment reference correlating record and processor transaction
    pub reference: String,
    /// Current status (always "pending" here)
    pub status: String,
    /// Processor's hosted checkout URL to redirect the payer to
    pub authorization_url: String,
}

/// Reservation record view for status pages.
#[derive(Debug, Serialize)]
pub struct ReservationView {
    /// Payment reference
    pub reference: String,
    /// What kind of action this records
    pub kind: String,
    /// Lifecycle status
    pub status: String,
    /// Amount in minor units
    pub amount_minor: i64,
    /// Why the record settled as failed, if it did
    pub failure_reason: Option<FailureReason>,
    /// Whether a manual refund is owed
    pub refund_due: bool,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record reached a terminal status
    pub settled_at: Option<DateTime<Utc>>,
}

impl From<ReservationRecord> for ReservationView {
    fn from(record: ReservationRecord) -> Self {
        Self {
            reference: record.payment_reference.as_str().to_string(),
            kind: record.kind.as_str().to_string(),
            status: record.status.as_str().to_string(),
            amount_minor: record.amount.minor_units(),
            failure_reason: record.failure_reason,
            refund_due: record.refund_due,
            created_at: record.created_at,
            settled_at: record.settled_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a donation reservation.
///
/// # Errors
///
/// Returns 400 for invalid input, 503 if the processor is unreachable.
pub async fn create_donation<S, L, G>(
    State(state): State<AppState<S, L, G>>,
    Json(request): Json<DonationRequest>,
) -> Result<(StatusCode, Json<ReservationCreatedResponse>), ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    let created = state
        .coordinator
        .create_reservation(
            ReservationKind::Donation,
            Money::from_minor_units(request.amount_minor),
            PayerIdentity::new(request.name, request.email),
            ResourceRef::None,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created_response(&created))))
}

/// Create a shop order reservation.
///
/// The stated total must equal subtotal + shipping; inventory is only
/// consumed when the payment settles successfully.
///
/// # Errors
///
/// Returns 400 for invalid input, 503 if the processor is unreachable.
pub async fn create_order<S, L, G>(
    State(state): State<AppState<S, L, G>>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<ReservationCreatedResponse>), ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    let lines = request
        .lines
        .into_iter()
        .map(|line| OrderLine {
            product_id: ResourceId::from_uuid(line.product_id),
            quantity: line.quantity,
            unit_price: Money::from_minor_units(line.unit_price_minor),
        })
        .collect();

    let created = state
        .coordinator
        .create_reservation(
            ReservationKind::Order,
            Money::from_minor_units(request.amount_minor),
            PayerIdentity::new(request.name, request.email),
            ResourceRef::Order {
                lines,
                subtotal: Money::from_minor_units(request.subtotal_minor),
                shipping: Money::from_minor_units(request.shipping_minor),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created_response(&created))))
}

/// Create an event-ticket reservation.
///
/// # Errors
///
/// Returns 400 for invalid input, 503 if the processor is unreachable.
pub async fn create_ticket_purchase<S, L, G>(
    State(state): State<AppState<S, L, G>>,
    Json(request): Json<TicketRequest>,
) -> Result<(StatusCode, Json<ReservationCreatedResponse>), ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    let created = state
        .coordinator
        .create_reservation(
            ReservationKind::TicketPurchase,
            Money::from_minor_units(request.amount_minor),
            PayerIdentity::new(request.name, request.email),
            ResourceRef::Tickets {
                event_id: EventId::from_uuid(request.event_id),
                ticket_type_id: ResourceId::from_uuid(request.ticket_type_id),
                quantity: request.quantity,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created_response(&created))))
}

/// Look up a reservation record by its payment reference.
///
/// Public endpoint for payment confirmation pages.
///
/// # Errors
///
/// Returns 404 for unknown references.
pub async fn get_reservation<S, L, G>(
    Path(reference): Path<String>,
    State(state): State<AppState<S, L, G>>,
) -> Result<Json<ReservationView>, ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    let record = state
        .coordinator
        .find_reservation(&PaymentReference::from_string(reference))
        .await?;

    Ok(Json(record.into()))
}

fn created_response(
    created: &causeway_core::settlement::CreatedReservation,
) -> ReservationCreatedResponse {
    ReservationCreatedResponse {
        reference: created.record.payment_reference.as_str().to_string(),
        status: created.record.status.as_str().to_string(),
        authorization_url: created.authorization_url.clone(),
    }
}
