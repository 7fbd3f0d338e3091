use std::time::{Duration, SystemTime};

use axum::Json;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Process start marker; touched at startup so uptime is measured
/// from boot rather than from the first health probe.
static START_TIME: Lazy<SystemTime> = Lazy::new(SystemTime::now);

pub fn mark_started() {
    Lazy::force(&START_TIME);
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

fn uptime() -> u64 {
    SystemTime::now()
        .duration_since(*START_TIME)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// Basic health check (`/health`)
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthInfo> {
    Json(HealthInfo {
        status: HealthStatus::Up,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: uptime(),
    })
}

/// Liveness check (`/health/live`)
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "up" }))
}
