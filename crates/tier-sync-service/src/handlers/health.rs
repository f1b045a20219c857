//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Whether Stripe lookups are available.
    pub stripe: bool,
    /// Whether the commerce platform is reachable by configuration.
    pub directory: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "tier-sync".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stripe: state.has_stripe(),
        directory: state.has_directory(),
    })
}
