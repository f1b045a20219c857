//! Commerce-platform client tests against a mock store API.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tier_sync_core::{CustomerId, CustomerName, GroupId};
use tier_sync_service::directory::{ApiGeneration, DirectoryClient, DirectoryError};
use tier_sync_service::reconcile::{GroupReconciler, GroupUpdateForm};

async fn client() -> (MockServer, DirectoryClient) {
    let server = MockServer::start().await;
    let client = DirectoryClient::new(server.uri(), "client-id", "access-token").unwrap();
    (server, client)
}

fn name(display: &str) -> CustomerName {
    CustomerName::from_display_name(Some(display))
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn every_call_carries_auth_and_json_headers() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers/lookup-by-email"))
        .and(header("X-Auth-Client", "client-id"))
        .and(header("X-Auth-Token", "access-token"))
        .and(header("Accept", "application/json"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "emails": ["a@x.com"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let found = client.lookup_by_email("  A@X.com ").await.unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn lookup_filters_near_matches() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers/lookup-by-email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [
            { "id": 1, "email": "a@x.com.au" },
            { "id": 2, "email": "A@X.COM", "customer_group_id": 3 }
        ]})))
        .mount(&server)
        .await;

    let found = client.lookup_by_email("a@x.com").await.unwrap().unwrap();

    assert_eq!(found.id, CustomerId::new(2));
    assert_eq!(found.group_id, Some(GroupId::new(3)));
}

#[tokio::test]
async fn lookup_falls_back_to_legacy_search() {
    for status in [404, 405, 501] {
        let (server, client) = client().await;
        Mock::given(method("POST"))
            .and(path("/v3/customers/lookup-by-email"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/customers"))
            .and(query_param("email", "a@x.com"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": 9, "email": "a@x.com" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let found = client.lookup_by_email("a@x.com").await.unwrap();

        assert_eq!(found.map(|c| c.id), Some(CustomerId::new(9)), "status {status}");
    }
}

#[tokio::test]
async fn legacy_lookup_no_content_means_absent() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers/lookup-by-email"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/customers"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert!(client.lookup_by_email("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn lookup_server_error_is_fatal() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers/lookup-by-email"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "title": "Boom" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/customers"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.lookup_by_email("a@x.com").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("Boom"));
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn modern_create_sets_group() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers"))
        .and(body_json(json!([{
            "email": "a@x.com",
            "first_name": "Ada",
            "last_name": "King Lovelace",
            "customer_group_id": 2
        }])))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "id": 41, "email": "a@x.com" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_customer("a@x.com", &name("Ada King Lovelace"), Some(GroupId::new(2)))
        .await
        .unwrap();

    assert_eq!(created.customer.id, CustomerId::new(41));
    assert_eq!(created.generation, ApiGeneration::Modern);
    assert!(created.group_applied);
}

#[tokio::test]
async fn modern_create_without_group_reports_not_applied() {
    let (server, client) = client().await;
    let client = client.with_group_at_create(false);
    Mock::given(method("POST"))
        .and(path("/v3/customers"))
        .and(body_json(json!([{
            "email": "a@x.com",
            "first_name": "Member",
            "last_name": "Customer"
        }])))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "id": 41, "email": "a@x.com" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_customer("a@x.com", &CustomerName::from_display_name(None), Some(GroupId::new(2)))
        .await
        .unwrap();

    assert!(!created.group_applied);
}

#[tokio::test]
async fn rejected_modern_create_falls_back_to_legacy() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": 422,
            "title": "Input is invalid"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/customers"))
        .and(body_json(json!({
            "email": "a@x.com",
            "first_name": "Ada",
            "last_name": "Customer"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 55, "email": "a@x.com" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_customer("a@x.com", &name("Ada"), Some(GroupId::new(2)))
        .await
        .unwrap();

    assert_eq!(created.customer.id, CustomerId::new(55));
    assert_eq!(created.generation, ApiGeneration::Legacy);
    assert!(!created.group_applied);
}

#[tokio::test]
async fn empty_create_response_is_malformed() {
    let (server, client) = client().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = client
        .create_customer("a@x.com", &name("Ada"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::Malformed { .. }));
}

#[tokio::test]
async fn transport_failure_never_falls_through() {
    // Port 1 is reserved and refuses connections.
    let client = DirectoryClient::new("http://127.0.0.1:1", "id", "token").unwrap();

    let err = client.lookup_by_email("a@x.com").await.unwrap_err();

    assert!(matches!(err, DirectoryError::Http(_)));
}

// ============================================================================
// Group updates
// ============================================================================

#[tokio::test]
async fn precise_update_accepts_empty_success() {
    let (server, client) = client().await;
    Mock::given(method("PATCH"))
        .and(path("/v3/customers/7"))
        .and(body_json(json!({ "customer_group_id": 2 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v3/customers"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let form = GroupReconciler::new(&client)
        .apply(CustomerId::new(7), GroupId::new(2))
        .await
        .unwrap();

    assert_eq!(form, GroupUpdateForm::Precise);
}

#[tokio::test]
async fn unsupported_precise_update_falls_back_to_bulk() {
    for status in [400, 404, 405, 422, 500, 501] {
        let (server, client) = client().await;
        Mock::given(method("PATCH"))
            .and(path("/v3/customers/7"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v3/customers"))
            .and(body_json(json!([{ "id": 7, "customer_group_id": 0 }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let form = GroupReconciler::new(&client)
            .apply(CustomerId::new(7), GroupId::NONE)
            .await
            .unwrap();

        assert_eq!(form, GroupUpdateForm::Bulk, "status {status}");
    }
}

#[tokio::test]
async fn forbidden_precise_update_is_fatal() {
    let (server, client) = client().await;
    Mock::given(method("PATCH"))
        .and(path("/v3/customers/7"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v3/customers"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = GroupReconciler::new(&client)
        .apply(CustomerId::new(7), GroupId::new(2))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
}
