use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::OrderBackendConfig;
use crate::errors::ServiceError;
use crate::models::{LineItem, ListPage, Order, OrderPatch, Payment, Subscription};

/// Leeway subtracted from the token lifetime so a token is refreshed
/// before it can expire mid-request.
const TOKEN_EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// Typed client for the order/commerce backend.
///
/// Authenticates with OAuth2 client credentials; the token is cached
/// and refreshed on expiry. All operations map backend failures into
/// the service error taxonomy.
pub struct OrderBackendClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<CachedToken>>,
}

impl OrderBackendClient {
    pub fn new(cfg: &OrderBackendConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to construct backend client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns a valid access token, authenticating if the cached one
    /// is missing or about to expire.
    async fn access_token(&self) -> Result<String, ServiceError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_valid() {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.is_valid() {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(self.url("/oauth/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                ServiceError::AuthError(format!("order backend token request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::AuthError(format!(
                "order backend rejected credentials (status {}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ServiceError::AuthError(format!("invalid token response from order backend: {}", e))
        })?;

        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now()
                + chrono::Duration::seconds((token.expires_in - TOKEN_EXPIRY_LEEWAY_SECS).max(0)),
        };
        debug!(expires_at = %cached.expires_at, "order backend token refreshed");
        *guard = Some(cached);

        Ok(token.access_token)
    }

    /// Maps a non-success backend response to a `ServiceError`. 409 is
    /// not handled here; operations with conflict semantics intercept
    /// it first.
    async fn fail(response: reqwest::Response, what: &str) -> ServiceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => ServiceError::NotFound(format!("{} not found", what)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::AuthError(format!(
                "order backend denied access while {} (status {})",
                what, status
            )),
            _ => ServiceError::ExternalServiceError(format!(
                "order backend error while {} (status {}): {}",
                what, status, body
            )),
        }
    }

    fn transport(what: &str, err: reqwest::Error) -> ServiceError {
        ServiceError::ExternalServiceError(format!("order backend unreachable while {}: {}", what, err))
    }

    fn decode(what: &str, err: reqwest::Error) -> ServiceError {
        ServiceError::ExternalServiceError(format!("invalid response from order backend while {}: {}", what, err))
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError> {
        let what = "fetching order";
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.url(&format!("/orders/{}", order_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if !response.status().is_success() {
            return Err(Self::fail(response, &format!("order {}", order_id)).await);
        }
        response.json().await.map_err(|e| Self::decode(what, e))
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self, order_id: &str) -> Result<Vec<Payment>, ServiceError> {
        let what = "listing payments";
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.url(&format!("/orders/{}/payments", order_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if !response.status().is_success() {
            return Err(Self::fail(response, what).await);
        }
        let page: ListPage<Payment> = response.json().await.map_err(|e| Self::decode(what, e))?;
        Ok(page.items)
    }

    #[instrument(skip(self))]
    pub async fn delete_payment(&self, order_id: &str, payment_id: &str) -> Result<(), ServiceError> {
        let what = "deleting payment";
        let token = self.access_token().await?;
        let response = self
            .client
            .delete(self.url(&format!("/orders/{}/payments/{}", order_id, payment_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if !response.status().is_success() {
            return Err(Self::fail(response, &format!("payment {}", payment_id)).await);
        }
        Ok(())
    }

    #[instrument(skip(self, payment))]
    pub async fn create_payment(
        &self,
        order_id: &str,
        payment: &Payment,
    ) -> Result<Payment, ServiceError> {
        let what = "creating payment";
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.url(&format!("/orders/{}/payments", order_id)))
            .bearer_auth(token)
            .json(payment)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if !response.status().is_success() {
            return Err(Self::fail(response, what).await);
        }
        response.json().await.map_err(|e| Self::decode(what, e))
    }

    #[instrument(skip(self))]
    pub async fn list_line_items(&self, order_id: &str) -> Result<Vec<LineItem>, ServiceError> {
        let what = "listing line items";
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.url(&format!("/orders/{}/lineitems", order_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if !response.status().is_success() {
            return Err(Self::fail(response, what).await);
        }
        let page: ListPage<LineItem> = response.json().await.map_err(|e| Self::decode(what, e))?;
        Ok(page.items)
    }

    #[instrument(skip(self, patch))]
    pub async fn patch_order(&self, order_id: &str, patch: &OrderPatch) -> Result<Order, ServiceError> {
        let what = "patching order";
        let token = self.access_token().await?;
        let response = self
            .client
            .patch(self.url(&format!("/orders/{}", order_id)))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if !response.status().is_success() {
            return Err(Self::fail(response, &format!("order {}", order_id)).await);
        }
        response.json().await.map_err(|e| Self::decode(what, e))
    }

    /// Transitions the order to its submitted terminal state. A 409
    /// means a concurrent invocation won the race; it surfaces as a
    /// submission failure for manual review rather than a duplicate
    /// submit.
    #[instrument(skip(self))]
    pub async fn submit_order(&self, order_id: &str) -> Result<Order, ServiceError> {
        let what = "submitting order";
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.url(&format!("/orders/{}/submit", order_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if response.status() == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::SubmissionError(format!(
                "order {} was already submitted: {}",
                order_id, body
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::SubmissionError(format!(
                "order backend refused submit for {} (status {}): {}",
                order_id, status, body
            )));
        }
        response.json().await.map_err(|e| Self::decode(what, e))
    }

    /// Creates a recurring-order subscription. A 409 on the
    /// deterministic identifier maps to `DuplicateSubscription`, which
    /// callers treat as already-exists.
    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    pub async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ServiceError> {
        let what = "creating subscription";
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.url("/subscriptions"))
            .bearer_auth(token)
            .json(subscription)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if response.status() == StatusCode::CONFLICT {
            warn!(subscription_id = %subscription.id, "subscription already exists");
            return Err(ServiceError::DuplicateSubscription(subscription.id.clone()));
        }
        if !response.status().is_success() {
            return Err(Self::fail(response, what).await);
        }
        response.json().await.map_err(|e| Self::decode(what, e))
    }

    /// Copies one line item into a subscription. Items keep their
    /// originating identifiers, so a 409 means the copy already
    /// happened on an earlier attempt.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn create_subscription_item(
        &self,
        subscription_id: &str,
        item: &LineItem,
    ) -> Result<LineItem, ServiceError> {
        let what = "copying subscription item";
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.url(&format!("/subscriptions/{}/items", subscription_id)))
            .bearer_auth(token)
            .json(item)
            .send()
            .await
            .map_err(|e| Self::transport(what, e))?;

        if response.status() == StatusCode::CONFLICT {
            warn!(item_id = %item.id, subscription_id, "subscription item already copied");
            return Err(ServiceError::DuplicateSubscription(item.id.clone()));
        }
        if !response.status().is_success() {
            return Err(Self::fail(response, what).await);
        }
        response.json().await.map_err(|e| Self::decode(what, e))
    }
}
