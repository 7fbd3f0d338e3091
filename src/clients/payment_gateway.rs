use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::config::PaymentGatewayConfig;
use crate::errors::ServiceError;

/// Gateway status string reported for a captured charge.
const STATUS_SUCCEEDED: &str = "succeeded";

/// Payment-method type assumed when the gateway reports none.
const DEFAULT_METHOD_TYPE: &str = "card";

/// The gateway's representation of an attempted charge. Amounts are in
/// minor currency units (cents).
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub client_secret: Option<String>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
}

impl PaymentIntent {
    /// Captured amount converted from minor to major currency units.
    pub fn amount_major(&self) -> Decimal {
        Decimal::new(self.amount, 2)
    }

    /// Whether the gateway reports the charge as captured.
    pub fn captured(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }

    /// First reported payment-method type, or the card default.
    pub fn method_type(&self) -> &str {
        self.payment_method_types
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_METHOD_TYPE)
    }
}

/// A stored payment method on the gateway side.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayPaymentMethod {
    pub id: String,
    pub customer: Option<String>,
    #[serde(rename = "type", default)]
    pub method_type: Option<String>,
}

/// Typed client for the payment gateway. Authenticates with the
/// secret API key as a bearer credential.
pub struct PaymentGatewayClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl PaymentGatewayClient {
    pub fn new(cfg: &PaymentGatewayConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to construct gateway client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            secret_key: cfg.secret_key.clone(),
        })
    }

    #[instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, intent_ref: &str) -> Result<PaymentIntent, ServiceError> {
        self.retrieve(&format!("/v1/payment_intents/{}", intent_ref), "payment intent", intent_ref)
            .await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_payment_method(
        &self,
        method_id: &str,
    ) -> Result<GatewayPaymentMethod, ServiceError> {
        self.retrieve(&format!("/v1/payment_methods/{}", method_id), "payment method", method_id)
            .await
    }

    async fn retrieve<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
        reference: &str,
    ) -> Result<T, ServiceError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                ServiceError::GatewayLookupError(format!(
                    "gateway unreachable while retrieving {} {}: {}",
                    what, reference, e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::GatewayLookupError(format!(
                "gateway rejected {} {} (status {}): {}",
                what, reference, status, body
            )));
        }

        response.json().await.map_err(|e| {
            ServiceError::GatewayLookupError(format!(
                "invalid gateway response for {} {}: {}",
                what, reference, e
            ))
        })
    }
}
