use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::clients::{GatewayPaymentMethod, OrderBackendClient, PaymentIntent};
use crate::config::SubscriptionDefaults;
use crate::errors::ServiceError;
use crate::models::{LineItem, Order, OrderPatch, Subscription, SubscriptionXp};
use crate::services::recurrence::next_order_date;

/// Materializes a recurring-order subscription from an order's
/// subscription-eligible line items.
///
/// Creation is idempotent at the identifier level: the subscription id
/// is derived from the order id, item copies keep their originating
/// ids, and the order patch is a plain overwrite. A retry that died
/// anywhere mid-materialization therefore converges on the same final
/// state.
pub struct SubscriptionMaterializer {
    order_backend: Arc<OrderBackendClient>,
    defaults: SubscriptionDefaults,
}

impl SubscriptionMaterializer {
    pub fn new(order_backend: Arc<OrderBackendClient>, defaults: SubscriptionDefaults) -> Self {
        Self {
            order_backend,
            defaults,
        }
    }

    #[instrument(skip(self, order, eligible_items, intent, method), fields(order_id = %order.id, eligible = eligible_items.len()))]
    pub async fn materialize(
        &self,
        order: &Order,
        eligible_items: &[LineItem],
        intent: &PaymentIntent,
        method: &GatewayPaymentMethod,
    ) -> Result<Subscription, ServiceError> {
        if eligible_items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "order {} has no subscription-eligible line items",
                order.id
            )));
        }

        let interval = match order.subscription_interval() {
            Some(raw) => raw.parse()?,
            None => self.defaults.interval,
        };
        let frequency = order
            .subscription_frequency()
            .unwrap_or(self.defaults.frequency);

        let subscription = Subscription {
            id: Subscription::id_for_order(&order.id),
            from_company_id: order.from_company_id.clone(),
            to_company_id: order.to_company_id.clone(),
            billing_address_id: order.billing_address_id.clone(),
            shipping_address_id: order.shipping_address_id.clone(),
            frequency,
            interval,
            next_order_date: next_order_date(interval, frequency, Utc::now()),
            active: true,
            xp: SubscriptionXp {
                token: intent.client_secret.clone(),
                payment_method_id: Some(method.id.clone()),
                customer_id: method.customer.clone(),
            },
        };

        let subscription = match self.order_backend.create_subscription(&subscription).await {
            Ok(created) => created,
            Err(ServiceError::DuplicateSubscription(id)) => {
                // An earlier invocation already created it. Continue
                // with the locally built value so item copies and the
                // order patch still run to completion.
                info!(subscription_id = %id, "subscription already exists, resuming materialization");
                subscription
            }
            Err(e) => {
                return Err(ServiceError::MaterializationError(format!(
                    "subscription create failed for order {}: {}",
                    order.id, e
                )))
            }
        };

        for item in eligible_items {
            match self
                .order_backend
                .create_subscription_item(&subscription.id, item)
                .await
            {
                Ok(_) => {}
                Err(ServiceError::DuplicateSubscription(_)) => {
                    debug!(item_id = %item.id, "subscription item already copied");
                }
                Err(e) => {
                    return Err(ServiceError::MaterializationError(format!(
                        "failed to copy line item {} into subscription {}: {}",
                        item.id, subscription.id, e
                    )))
                }
            }
        }

        let patch = OrderPatch::link_subscription(
            &subscription.id,
            subscription.frequency,
            subscription.interval,
            subscription.active,
        );
        self.order_backend
            .patch_order(&order.id, &patch)
            .await
            .map_err(|e| {
                ServiceError::MaterializationError(format!(
                    "failed to link subscription {} to order {}: {}",
                    subscription.id, order.id, e
                ))
            })?;

        info!(
            order_id = %order.id,
            subscription_id = %subscription.id,
            next_order_date = %subscription.next_order_date,
            items = eligible_items.len(),
            "subscription materialized"
        );

        Ok(subscription)
    }
}
