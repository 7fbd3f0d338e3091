use axum::http::header;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

use crate::errors::ServiceError;

/// Prometheus text exposition of the default registry.
pub async fn metrics() -> Result<impl IntoResponse, ServiceError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        ServiceError::InternalError(format!("failed to encode metrics: {}", e))
    })?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    ))
}
