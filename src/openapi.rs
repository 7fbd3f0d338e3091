use axum::Json;
use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Checkout API",
        version = "0.2.0",
        description = "Checkout finalization and recurring-order subscription service. \
            Receives the payment gateway's redirect callback, reconciles the charge \
            against the order, materializes a subscription for eligible carts and \
            submits the order."
    ),
    paths(
        handlers::checkout::complete_checkout,
        handlers::health::health_check,
    ),
    components(schemas(ErrorResponse)),
    tags(
        (name = "Checkout", description = "Checkout finalization"),
        (name = "Health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document (`/api-docs/openapi.json`).
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
