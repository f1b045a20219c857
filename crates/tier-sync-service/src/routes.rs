//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{catalog, health, media, webhooks};
use crate::state::AppState;

/// Maximum concurrent media streams.
/// Each stream holds an upstream connection open for its whole duration.
const MEDIA_MAX_CONCURRENT_REQUESTS: usize = 32;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/stripe` - Stripe webhooks
///
/// ## Relays
/// - `GET /catalog` - CSV catalog, CORS limited to the configured origin
/// - `GET /media` - Signed, time-limited media streaming
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let catalog_origin = state.config.catalog_allowed_origin.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // The catalog carries its own single-origin CORS policy, so it stays
    // outside the global CORS layer.
    let catalog_routes = Router::new()
        .route("/catalog", get(catalog::catalog))
        .layer(build_catalog_cors_layer(catalog_origin.as_deref()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )));

    // Media streams outlive the request timeout, so they sit outside it.
    let media_routes = Router::new()
        .route("/media", get(media::media))
        .layer(ConcurrencyLimitLayer::new(MEDIA_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Webhooks (no rate limit - controlled by Stripe)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .merge(media_routes)
        .layer(cors);

    Router::new()
        .merge(api_routes)
        .merge(catalog_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// CORS for the catalog relay: a single origin, read-only methods.
fn build_catalog_cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);

    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer,
    }
}
