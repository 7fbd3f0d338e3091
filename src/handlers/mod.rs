pub mod checkout;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::services::checkout::CheckoutService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
}

/// Assembles the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/checkout/:order_id", get(checkout::complete_checkout))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/metrics", get(metrics::metrics))
        .route("/api-docs/openapi.json", get(crate::openapi::openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
