use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::Subscription;

/// Outbound webhook event envelope for the notification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "subscription_created")]
    SubscriptionCreated { data: SubscriptionEventData },
}

/// Structured subscription-event payload. The notification
/// collaborator performs its own template merge and delivery from
/// this; nothing content-related leaves this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEventData {
    pub order_id: String,
    pub next_order_date: DateTime<Utc>,
    pub subscription: Subscription,
}

/// HMAC signature generator for webhook authentication
pub struct SignatureGenerator {
    secret: String,
}

impl SignatureGenerator {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Generate HMAC signature for webhook payload
    pub fn sign_payload(&self, timestamp: &str, body: &str) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let signed_payload = format!("{}.{}", timestamp, body);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Delivery service for subscription notifications.
#[derive(Clone)]
pub struct NotificationWebhookService {
    client: reqwest::Client,
    signature_generator: Option<Arc<SignatureGenerator>>,
    max_retries: u32,
}

impl NotificationWebhookService {
    pub fn new(webhook_secret: Option<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to construct webhook client: {}", e))
            })?;

        Ok(Self {
            client,
            signature_generator: webhook_secret
                .map(|secret| Arc::new(SignatureGenerator::new(secret))),
            max_retries: 3,
        })
    }

    /// Queue a subscription-created notification for delivery.
    #[instrument(skip(self, data), fields(order_id = %data.order_id))]
    pub async fn send_subscription_created(
        &self,
        webhook_url: &str,
        data: SubscriptionEventData,
    ) -> Result<(), ServiceError> {
        let event = WebhookEvent::SubscriptionCreated { data };
        self.send_async(webhook_url.to_string(), event);
        Ok(())
    }

    /// Send webhook with retry logic
    #[instrument(skip(self, event))]
    async fn send_webhook(&self, webhook_url: &str, event: WebhookEvent) -> Result<(), ServiceError> {
        let body = serde_json::to_string(&event)
            .map_err(|e| ServiceError::InternalError(format!("webhook serialization: {}", e)))?;

        let timestamp = Utc::now().to_rfc3339();

        let signature = self
            .signature_generator
            .as_ref()
            .map(|gen| gen.sign_payload(&timestamp, &body));

        // Retry with exponential backoff: 1s, 2s, 4s
        for attempt in 1..=self.max_retries {
            let mut request = self
                .client
                .post(webhook_url)
                .header("Content-Type", "application/json")
                .header("Timestamp", &timestamp)
                .body(body.clone());

            if let Some(ref sig) = signature {
                request = request.header("Merchant-Signature", sig);
            }

            match request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        info!("Webhook delivered successfully to {}", webhook_url);
                        return Ok(());
                    } else {
                        warn!(
                            "Webhook delivery failed with status: {} (attempt {}/{})",
                            response.status(),
                            attempt,
                            self.max_retries
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        "Webhook delivery error: {} (attempt {}/{})",
                        e, attempt, self.max_retries
                    );
                }
            }

            if attempt < self.max_retries {
                let backoff = Duration::from_secs(2_u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }
        }

        error!(
            "Webhook delivery failed after {} attempts",
            self.max_retries
        );
        Err(ServiceError::ExternalServiceError(format!(
            "Failed to deliver webhook after {} retries",
            self.max_retries
        )))
    }

    /// Send webhook asynchronously (fire-and-forget with logging)
    pub fn send_async(&self, webhook_url: String, event: WebhookEvent) {
        let service = self.clone();

        tokio::spawn(async move {
            if let Err(e) = service.send_webhook(&webhook_url, event).await {
                error!("Async webhook delivery failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::{SubscriptionInterval, SubscriptionXp};

    fn sample_subscription() -> Subscription {
        Subscription {
            id: "SO1".to_string(),
            from_company_id: None,
            to_company_id: None,
            billing_address_id: None,
            shipping_address_id: None,
            frequency: 4,
            interval: SubscriptionInterval::Weeks,
            next_order_date: "2024-01-29T00:00:00Z".parse().unwrap(),
            active: true,
            xp: SubscriptionXp::default(),
        }
    }

    #[test]
    fn test_webhook_event_serialization() {
        let event = WebhookEvent::SubscriptionCreated {
            data: SubscriptionEventData {
                order_id: "O1".to_string(),
                next_order_date: "2024-01-29T00:00:00Z".parse().unwrap(),
                subscription: sample_subscription(),
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("subscription_created"));
        assert!(json.contains("SO1"));
    }

    #[test]
    fn test_signature_generation() {
        let generator = SignatureGenerator::new("test_secret".to_string());
        let timestamp = "2025-01-01T00:00:00Z";
        let body = r#"{"type":"subscription_created"}"#;

        let sig = generator.sign_payload(timestamp, body);
        assert!(!sig.is_empty());
        assert_eq!(sig.len(), 64); // SHA256 produces 32 bytes = 64 hex chars
    }

    #[test]
    fn test_signature_is_deterministic() {
        let generator = SignatureGenerator::new("test_secret".to_string());
        let a = generator.sign_payload("t", "body");
        let b = generator.sign_payload("t", "body");
        assert_eq!(a, b);

        let c = generator.sign_payload("t", "other");
        assert_ne!(a, c);
    }
}
