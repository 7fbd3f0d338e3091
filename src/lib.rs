//! Checkout API Library
//!
//! Finalizes e-commerce checkouts against an external order backend
//! and payment gateway: payment reconciliation, recurring-order
//! subscription materialization and order submission, triggered by the
//! gateway's redirect callback.

use std::sync::Arc;

pub mod clients;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod webhooks;

pub use config::AppConfig;
pub use errors::ServiceError;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: handlers::AppServices,
}
