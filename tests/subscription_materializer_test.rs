//! Behavioral tests for the subscription materializer, driven against
//! a mocked order backend.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use checkout_api::clients::{GatewayPaymentMethod, OrderBackendClient, PaymentIntent};
use checkout_api::config::{OrderBackendConfig, SubscriptionDefaults};
use checkout_api::errors::ServiceError;
use checkout_api::models::{LineItem, Order};
use checkout_api::services::subscriptions::SubscriptionMaterializer;

fn order(order_id: &str, xp: serde_json::Value) -> Order {
    serde_json::from_value(json!({
        "ID": order_id,
        "Status": "Unsubmitted",
        "Total": 100.00,
        "FromCompanyID": "buyer-co",
        "ToCompanyID": "seller-co",
        "BillingAddressID": "bill-1",
        "ShippingAddressID": "ship-1",
        "xp": xp
    }))
    .expect("order json")
}

fn eligible_item(id: &str) -> LineItem {
    serde_json::from_value(json!({
        "ID": id,
        "ProductID": "P1",
        "Quantity": 1,
        "UnitPrice": 60.00,
        "LineTotal": 60.00,
        "xp": { "Subscription": true }
    }))
    .expect("line item json")
}

fn intent() -> PaymentIntent {
    serde_json::from_value(json!({
        "id": "pi_123",
        "amount": 10000,
        "currency": "usd",
        "status": "succeeded",
        "client_secret": "pi_123_secret_abc",
        "payment_method": "pm_1",
        "payment_method_types": ["card"]
    }))
    .expect("intent json")
}

fn gateway_method() -> GatewayPaymentMethod {
    serde_json::from_value(json!({
        "id": "pm_1",
        "customer": "cus_1",
        "type": "card"
    }))
    .expect("method json")
}

async fn materializer_against(backend: &MockServer) -> SubscriptionMaterializer {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .mount(backend)
        .await;

    let client = Arc::new(
        OrderBackendClient::new(&OrderBackendConfig {
            base_url: backend.uri(),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            timeout_secs: 5,
        })
        .expect("backend client"),
    );

    SubscriptionMaterializer::new(client, SubscriptionDefaults::default())
}

async fn mount_materialization_mocks(backend: &MockServer, order_id: &str) {
    // First create succeeds, every replay conflicts on the
    // deterministic identifier.
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(common::created_subscription(order_id)),
        )
        .up_to_n_times(1)
        .mount(backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(409))
        .mount(backend)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/subscriptions/S{}/items", order_id)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ID": "li-1",
            "ProductID": "P1",
            "Quantity": 1
        })))
        .up_to_n_times(1)
        .mount(backend)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/subscriptions/S{}/items", order_id)))
        .respond_with(ResponseTemplate::new(409))
        .mount(backend)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("/orders/{}", order_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::unsubmitted_order(order_id)))
        .mount(backend)
        .await;
}

#[tokio::test]
async fn test_materialize_twice_never_creates_two_subscriptions() {
    let backend = MockServer::start().await;
    let materializer = materializer_against(&backend).await;
    mount_materialization_mocks(&backend, "O1").await;

    let order = order("O1", json!({"Subscription": {"Frequency": 4, "Interval": "Weeks"}}));
    let items = vec![eligible_item("li-1")];

    let first = materializer
        .materialize(&order, &items, &intent(), &gateway_method())
        .await
        .expect("first materialization");
    let second = materializer
        .materialize(&order, &items, &intent(), &gateway_method())
        .await
        .expect("second materialization");

    assert_eq!(first.id, "SO1");
    assert_eq!(second.id, "SO1", "replays must land on the same identifier");

    // Both invocations attempted the create; the backend accepted one.
    let creates = backend
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.to_string() == "POST" && r.url.path() == "/subscriptions")
        .count();
    assert_eq!(creates, 2);
}

#[tokio::test]
async fn test_unrecognized_interval_is_a_hard_error() {
    let backend = MockServer::start().await;
    let materializer = materializer_against(&backend).await;

    let order = order(
        "O2",
        json!({"Subscription": {"Frequency": 4, "Interval": "Fortnights"}}),
    );
    let items = vec![eligible_item("li-1")];

    let err = materializer
        .materialize(&order, &items, &intent(), &gateway_method())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::ValidationError(_)));
    // The parse failure happens before any backend write.
    let writes = backend
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() != "/oauth/token")
        .count();
    assert_eq!(writes, 0);
}

#[tokio::test]
async fn test_absent_metadata_falls_back_to_named_defaults() {
    let backend = MockServer::start().await;
    let materializer = materializer_against(&backend).await;
    mount_materialization_mocks(&backend, "O3").await;

    let order = order("O3", json!({}));
    let items = vec![eligible_item("li-1")];

    let before = Utc::now();
    let subscription = materializer
        .materialize(&order, &items, &intent(), &gateway_method())
        .await
        .expect("materialization");

    // Defaults: every 4 weeks from now.
    let expected_min = before + Duration::weeks(4);
    let expected_max = Utc::now() + Duration::weeks(4);
    let sent = backend.received_requests().await.unwrap_or_default();
    let create = sent
        .iter()
        .find(|r| r.method.to_string() == "POST" && r.url.path() == "/subscriptions")
        .expect("subscription create request");
    let body: serde_json::Value = serde_json::from_slice(&create.body).expect("json body");
    assert_eq!(body["Frequency"], 4);
    assert_eq!(body["Interval"], "Weeks");
    let next: chrono::DateTime<Utc> = body["NextOrderDate"]
        .as_str()
        .expect("next order date")
        .parse()
        .expect("timestamp");
    assert!(next >= expected_min && next <= expected_max);

    // The returned subscription is the backend's created entity.
    assert_eq!(subscription.id, "SO3");
}

#[tokio::test]
async fn test_empty_eligible_slice_is_rejected() {
    let backend = MockServer::start().await;
    let materializer = materializer_against(&backend).await;

    let order = order("O4", json!({}));
    let err = materializer
        .materialize(&order, &[], &intent(), &gateway_method())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::ValidationError(_)));
}
