use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Standardized JSON error body returned for failed requests.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Internal Server Error",
    "message": "Gateway lookup failed: payment intent pi_123 not found",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Internal Server Error")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Error taxonomy of the checkout finalization workflow.
///
/// Fatal variants propagate to the HTTP layer unmodified; the two
/// non-fatal outcomes (invalid inbound payment reference, order not in
/// a finalizable state) never reach this type — the orchestrator maps
/// them to a `false` result instead.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gateway lookup failed: {0}")]
    GatewayLookupError(String),

    /// A stale payment record could not be removed. The reconciler must
    /// not create a new payment after this, so a single order never
    /// shows both an old and a new charge.
    #[error("Partial payment cleanup: {0}")]
    PartialCleanupError(String),

    #[error("Subscription materialization failed: {0}")]
    MaterializationError(String),

    /// The backend rejected a subscription create because the
    /// deterministic identifier already exists. Success-equivalent:
    /// absorbed by the materializer, never surfaced to callers.
    #[error("Subscription already exists: {0}")]
    DuplicateSubscription(String),

    #[error("Order submission failed: {0}")]
    SubmissionError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::DuplicateSubscription(_) => StatusCode::CONFLICT,
            Self::GatewayLookupError(_)
            | Self::PartialCleanupError(_)
            | Self::MaterializationError(_)
            | Self::SubmissionError(_)
            | Self::ExternalServiceError(_)
            | Self::ConfigError(_)
            | Self::EventError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::ConfigError(_) | Self::EventError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
