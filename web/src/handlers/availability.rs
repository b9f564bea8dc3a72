//! Inventory endpoints.
//!
//! - GET /api/availability/:resource_id — remaining capacity for display
//! - POST /api/admin/resources — register a counter for a new resource
//!
//! The availability read is tolerant of brief staleness; overselling is
//! prevented by the settlement path, not by this read.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use causeway_core::types::ResourceId;
use causeway_core::{InventoryLedger, PaymentGateway, ReservationStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a finite-capacity resource.
#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    /// Resource identifier (a ticket type or shop product id)
    pub resource_id: Uuid,
    /// Fixed capacity ceiling
    pub capacity: u32,
}

/// Remaining-capacity view.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Resource identifier
    pub resource_id: Uuid,
    /// Fixed ceiling set at creation
    pub capacity: u32,
    /// Capacity still available ("12 left")
    pub remaining: u32,
}

/// Remaining capacity for a resource.
///
/// # Errors
///
/// Returns 404 if no counter exists for the resource.
pub async fn get_availability<S, L, G>(
    Path(resource_id): Path<Uuid>,
    State(state): State<AppState<S, L, G>>,
) -> Result<Json<AvailabilityResponse>, ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    let counter = state
        .coordinator
        .availability(ResourceId::from_uuid(resource_id))
        .await?;

    Ok(Json(AvailabilityResponse {
        resource_id,
        capacity: counter.capacity,
        remaining: counter.remaining(),
    }))
}

/// Register the inventory counter for a new resource.
///
/// # Errors
///
/// Returns 500 if a counter already exists for the resource.
pub async fn create_resource<S, L, G>(
    State(state): State<AppState<S, L, G>>,
    Json(request): Json<CreateResourceRequest>,
) -> Result<StatusCode, ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    state
        .coordinator
        .create_resource(ResourceId::from_uuid(request.resource_id), request.capacity)
        .await?;

    Ok(StatusCode::CREATED)
}
