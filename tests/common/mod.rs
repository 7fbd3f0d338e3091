// Shared across test binaries; not every helper is used by each one.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use checkout_api::clients::{OrderBackendClient, PaymentGatewayClient};
use checkout_api::config::{
    AppConfig, OrderBackendConfig, PaymentGatewayConfig, SubscriptionDefaults,
};
use checkout_api::handlers::{self, AppServices};
use checkout_api::services::checkout::CheckoutService;
use checkout_api::services::payments::PaymentReconciler;
use checkout_api::services::subscriptions::SubscriptionMaterializer;
use checkout_api::AppState;

pub const PUBLIC_BASE_URL: &str = "https://shop.example.com";

/// Test harness standing up the application router against mock
/// servers for the order backend and the payment gateway.
pub struct TestApp {
    router: Router,
    pub backend: MockServer,
    pub gateway: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        let backend = MockServer::start().await;
        let gateway = MockServer::start().await;

        // Client-credentials token endpoint; every backend call needs it.
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-token",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(&backend)
            .await;

        let cfg = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            log_json: false,
            public_base_url: PUBLIC_BASE_URL.to_string(),
            order_backend: OrderBackendConfig {
                base_url: backend.uri(),
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string(),
                timeout_secs: 5,
            },
            payment_gateway: PaymentGatewayConfig {
                base_url: gateway.uri(),
                secret_key: "sk_test_123".to_string(),
                timeout_secs: 5,
            },
            subscription: SubscriptionDefaults::default(),
            notification_webhook_url: None,
            notification_webhook_secret: None,
        };

        let order_backend =
            Arc::new(OrderBackendClient::new(&cfg.order_backend).expect("backend client"));
        let payment_gateway =
            Arc::new(PaymentGatewayClient::new(&cfg.payment_gateway).expect("gateway client"));

        let reconciler = PaymentReconciler::new(order_backend.clone(), payment_gateway.clone());
        let materializer =
            SubscriptionMaterializer::new(order_backend.clone(), cfg.subscription.clone());
        let checkout = Arc::new(CheckoutService::new(
            order_backend,
            reconciler,
            materializer,
            None,
        ));

        let state = AppState {
            config: Arc::new(cfg),
            services: AppServices { checkout },
        };

        Self {
            router: handlers::router(state),
            backend,
            gateway,
        }
    }

    /// Issues a GET against the application router.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    /// Requests the backend recorded, as (method, path) pairs, with
    /// the token handshake filtered out.
    pub async fn backend_calls(&self) -> Vec<(String, String)> {
        self.backend
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| (r.method.to_string(), r.url.path().to_string()))
            .filter(|(_, p)| p != "/oauth/token")
            .collect()
    }

    /// Bodies of recorded backend requests matching a method and path.
    pub async fn backend_bodies(&self, wanted_method: &str, wanted_path: &str) -> Vec<Value> {
        self.backend
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.to_string() == wanted_method && r.url.path() == wanted_path)
            .map(|r| serde_json::from_slice(&r.body).expect("json body"))
            .collect()
    }
}

pub fn assert_redirects_to(response: &Response<Body>, location: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some(location)
    );
}

// ---- canned wire fixtures ----

pub fn unsubmitted_order(order_id: &str) -> Value {
    json!({
        "ID": order_id,
        "Status": "Unsubmitted",
        "Total": 100.00,
        "FromCompanyID": "buyer-co",
        "ToCompanyID": "seller-co",
        "BillingAddressID": "bill-1",
        "ShippingAddressID": "ship-1",
        "xp": {
            "Subscription": { "Frequency": 4, "Interval": "Weeks" }
        }
    })
}

pub fn captured_intent(intent_ref: &str, amount_minor: i64) -> Value {
    json!({
        "id": intent_ref,
        "amount": amount_minor,
        "currency": "usd",
        "status": "succeeded",
        "client_secret": format!("{}_secret_abc", intent_ref),
        "payment_method": "pm_1",
        "payment_method_types": ["card"]
    })
}

pub fn payment_method() -> Value {
    json!({
        "id": "pm_1",
        "customer": "cus_1",
        "type": "card"
    })
}

pub fn line_items_page(order_id: &str, eligible_first: bool) -> Value {
    json!({
        "Items": [
            {
                "ID": format!("{}-li-1", order_id),
                "ProductID": "P1",
                "Quantity": 1,
                "UnitPrice": 60.00,
                "LineTotal": 60.00,
                "xp": { "Subscription": eligible_first }
            },
            {
                "ID": format!("{}-li-2", order_id),
                "ProductID": "P2",
                "Quantity": 2,
                "UnitPrice": 20.00,
                "LineTotal": 40.00,
                "xp": { "Subscription": false }
            }
        ]
    })
}

pub fn created_subscription(order_id: &str) -> Value {
    json!({
        "ID": format!("S{}", order_id),
        "FromCompanyID": "buyer-co",
        "ToCompanyID": "seller-co",
        "BillingAddressID": "bill-1",
        "ShippingAddressID": "ship-1",
        "Frequency": 4,
        "Interval": "Weeks",
        "NextOrderDate": "2024-01-29T00:00:00Z",
        "Active": true,
        "xp": {
            "Token": "pi_123_secret_abc",
            "PaymentMethodId": "pm_1",
            "CustomerId": "cus_1"
        }
    })
}

pub fn stale_payment(payment_id: &str) -> Value {
    json!({
        "ID": payment_id,
        "Type": "CreditCard",
        "Accepted": true,
        "Amount": "100.00",
        "DateCreated": "2024-01-01T00:00:00Z",
        "Transactions": []
    })
}

pub fn created_payment() -> Value {
    json!({
        "ID": "pay-new",
        "Type": "CreditCard",
        "Accepted": true,
        "Amount": "100.00",
        "DateCreated": "2024-01-01T00:00:00Z",
        "Transactions": [{
            "Amount": "100.00",
            "Currency": "usd",
            "DateExecuted": "2024-01-01T00:00:00Z",
            "Succeeded": true,
            "ResultCode": "succeeded",
            "Type": "card"
        }]
    })
}
