//! Common test utilities for tier-sync integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use wiremock::MockServer;

use tier_sync_core::{GroupId, TierMapping};
use tier_sync_service::stripe::signature::sign_payload;
use tier_sync_service::{create_router, AppState, ServiceConfig};

/// Webhook signing secret shared by the harness and signed test deliveries.
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Price mapped to group 2.
pub const INTRO_PRICE: &str = "price_intro_m";

/// Price mapped to group 3.
pub const FULL_PRICE: &str = "price_full_y";

/// Media relay secret.
pub const MEDIA_SECRET: &str = "media-secret";

/// Test harness with mock Stripe and commerce-platform upstreams.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Stands in for the Stripe API.
    pub stripe: MockServer,
    /// Stands in for the commerce platform (and relay upstreams).
    pub directory: MockServer,
}

impl TestHarness {
    /// Create a harness with default settings.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness, adjusting the configuration before the router is built.
    pub async fn with_config(customize: impl FnOnce(&mut ServiceConfig)) -> Self {
        let stripe = MockServer::start().await;
        let directory = MockServer::start().await;

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            stripe_api_key: Some("sk_test_harness".into()),
            stripe_api_url: stripe.uri(),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            signature_tolerance_seconds: 300,
            directory_api_url: Some(directory.uri()),
            directory_client_id: Some("client-id".into()),
            directory_access_token: Some("access-token".into()),
            assign_group_at_create: true,
            remove_on_payment_failure: false,
            tier_mapping: TierMapping::new()
                .with_entry(INTRO_PRICE, GroupId::new(2))
                .with_entry(FULL_PRICE, GroupId::new(3)),
            catalog_csv_url: Some(format!("{}/catalog.csv", directory.uri())),
            catalog_allowed_origin: Some("https://shop.example".into()),
            media_signing_secret: Some(MEDIA_SECRET.into()),
        };
        customize(&mut config);

        let state = AppState::new(config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            stripe,
            directory,
        }
    }

    /// Post `event` signed with the harness secret.
    pub async fn post_webhook(&self, event: &Value) -> TestResponse {
        let payload = serde_json::to_string(event).unwrap();
        let header = sign_payload(payload.as_bytes(), WEBHOOK_SECRET, now());
        self.post_raw(payload, Some(header)).await
    }

    /// Post an exact body with an optional signature header.
    pub async fn post_raw(&self, payload: String, signature: Option<String>) -> TestResponse {
        let mut request = self.server.post("/webhooks/stripe");
        if let Some(signature) = signature {
            request = request.add_header("stripe-signature", signature);
        }
        request.text(&payload).await
    }

    /// Number of requests the mock Stripe API received.
    pub async fn stripe_calls(&self) -> usize {
        self.stripe.received_requests().await.map_or(0, |r| r.len())
    }

    /// Number of requests the mock commerce platform received.
    pub async fn directory_calls(&self) -> usize {
        self.directory.received_requests().await.map_or(0, |r| r.len())
    }
}

/// Current unix time.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build a Stripe event envelope.
pub fn event(event_type: &str, object: Value) -> Value {
    json!({
        "id": format!("evt_{}", event_type.replace('.', "_")),
        "object": "event",
        "type": event_type,
        "api_version": "2024-06-20",
        "created": now(),
        "data": { "object": object }
    })
}

/// A paid checkout session for `email` buying `price`.
pub fn paid_checkout(email: &str, name: Option<&str>, price: &str) -> Value {
    json!({
        "id": "cs_test_1",
        "object": "checkout.session",
        "payment_status": "paid",
        "customer": "cus_test_1",
        "customer_details": { "email": email, "name": name },
        "line_items": { "data": [ { "price": { "id": price } } ] }
    })
}

/// A commerce-platform customer record.
pub fn customer_record(id: u64, email: &str, group: Option<u32>) -> Value {
    match group {
        Some(group) => json!({ "id": id, "email": email, "customer_group_id": group }),
        None => json!({ "id": id, "email": email }),
    }
}
