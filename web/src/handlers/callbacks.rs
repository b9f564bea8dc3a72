//! Settlement entry points driven by the payment processor.
//!
//! - GET /payments/callback — the browser return leg. The processor sends
//!   the payer back here with the reference as a query parameter. The
//!   redirect is untrusted input: settlement re-verifies with the processor
//!   before anything is committed.
//! - POST /payments/webhook — the processor's server-to-server
//!   notification. Arrives independently of the browser and may duplicate
//!   it; settlement absorbs the duplicate.

use crate::error::ApiError;
use crate::handlers::reservations::ReservationView;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use causeway_core::types::PaymentReference;
use causeway_core::{InventoryLedger, PaymentGateway, ReservationStore, SettlementError};
use serde::Deserialize;

/// Query parameters on the browser return leg.
///
/// Paystack appends both `trxref` and `reference`; either is accepted.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Payment reference
    pub reference: Option<String>,
    /// Paystack's alias for the same value
    pub trxref: Option<String>,
}

/// Webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    /// Event name, e.g. "charge.success"
    pub event: String,
    /// Event payload
    pub data: WebhookData,
}

/// Webhook event payload (only the reference matters; the status is
/// re-verified with the processor, never trusted from the push).
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    /// Payment reference
    pub reference: String,
}

/// Handle the processor's browser return leg.
///
/// Settles the referenced reservation and returns the resulting record so
/// the frontend can render a confirmation or failure page.
///
/// # Errors
///
/// Returns 400 if no reference is present, 404 for unknown references,
/// 503 if verification could not complete (the record stays pending).
pub async fn payment_callback<S, L, G>(
    Query(query): Query<CallbackQuery>,
    State(state): State<AppState<S, L, G>>,
) -> Result<Json<ReservationView>, ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    let reference = query
        .reference
        .or(query.trxref)
        .ok_or_else(|| ApiError::bad_request("Missing payment reference"))?;

    let outcome = state
        .coordinator
        .settle(&PaymentReference::from_string(reference))
        .await?;

    Ok(Json(outcome.record.into()))
}

/// Handle the processor's server-to-server webhook.
///
/// Returns 200 for anything that was handled or deliberately ignored, so
/// the processor stops redelivering; only transient failures surface as
/// 5xx to trigger a redelivery.
///
/// # Errors
///
/// Returns 503 if verification could not complete, 500 on storage failure.
pub async fn payment_webhook<S, L, G>(
    State(state): State<AppState<S, L, G>>,
    Json(event): Json<WebhookEvent>,
) -> Result<StatusCode, ApiError>
where
    S: ReservationStore + 'static,
    L: InventoryLedger + 'static,
    G: PaymentGateway + 'static,
{
    if !event.event.starts_with("charge.") {
        tracing::debug!(event = %event.event, "Ignoring webhook event type");
        return Ok(StatusCode::OK);
    }

    let reference = PaymentReference::from_string(event.data.reference);

    match state.coordinator.settle(&reference).await {
        Ok(outcome) => {
            tracing::info!(
                reference = %reference,
                status = %outcome.record.status,
                newly_settled = outcome.newly_settled,
                "Webhook settlement processed"
            );
            Ok(StatusCode::OK)
        }
        // A webhook for a reference we never issued; acknowledged so the
        // processor does not redeliver it forever.
        Err(SettlementError::NotFound { reference }) => {
            tracing::warn!(reference = %reference, "Webhook for unknown reference");
            Ok(StatusCode::OK)
        }
        Err(e) => Err(e.into()),
    }
}
