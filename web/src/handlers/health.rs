//! Liveness probe.

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the server is up
    pub status: &'static str,
}

/// Liveness probe for load balancers.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
