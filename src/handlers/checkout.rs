use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::errors::ServiceError;
use crate::handlers::AppState;

/// Query parameters appended by the payment gateway to its redirect
/// callback after the buyer confirms the charge.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CheckoutRedirectParams {
    /// Gateway reference of the attempted charge
    pub payment_intent: Option<String>,
    /// Client secret echo; unused server-side
    pub payment_intent_client_secret: Option<String>,
    /// Gateway's redirect outcome hint; the intent lookup is authoritative
    pub redirect_status: Option<String>,
}

/// Payment-gateway redirect callback that finalizes a checkout.
///
/// A missing payment reference is a client error and maps to the
/// not-found redirect, as does an order that is not in a finalizable
/// state. Fatal workflow errors surface as a 500 JSON body.
#[utoipa::path(
    get,
    path = "/checkout/{order_id}",
    params(
        ("order_id" = String, Path, description = "Order to finalize"),
        CheckoutRedirectParams
    ),
    responses(
        (status = 303, description = "Redirect to the order success page or the not-found page"),
        (status = 500, description = "Finalization failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn complete_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(params): Query<CheckoutRedirectParams>,
) -> Result<Redirect, ServiceError> {
    let base = state.config.public_base_url.trim_end_matches('/');
    let not_found = format!("{}/not-found", base);

    let payment_intent = match params.payment_intent.filter(|p| !p.trim().is_empty()) {
        Some(reference) => reference,
        None => {
            warn!(order_id = %order_id, "redirect callback without a payment intent reference");
            return Ok(Redirect::to(&not_found));
        }
    };

    info!(
        order_id = %order_id,
        redirect_status = params.redirect_status.as_deref().unwrap_or("-"),
        "checkout completion signal received"
    );

    if state
        .services
        .checkout
        .finalize(&order_id, &payment_intent)
        .await?
    {
        Ok(Redirect::to(&format!("{}/payment/{}", base, order_id)))
    } else {
        Ok(Redirect::to(&not_found))
    }
}
