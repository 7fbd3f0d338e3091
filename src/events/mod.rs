use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::models::Subscription;
use crate::webhooks::{NotificationWebhookService, SubscriptionEventData};

/// Domain events emitted by the checkout workflow. Event delivery is
/// best-effort: a failed send is logged and never fails the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PaymentReconciled {
        order_id: String,
        amount: Decimal,
        currency: String,
    },
    SubscriptionCreated {
        order_id: String,
        subscription: Subscription,
    },
    OrderSubmitted {
        order_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes the event channel until every sender is dropped. All
/// events are logged; subscription creations are additionally
/// forwarded to the notification webhook when one is configured.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    webhook_service: Option<Arc<NotificationWebhookService>>,
    webhook_url: Option<String>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentReconciled {
                order_id,
                amount,
                currency,
            } => {
                info!(order_id = %order_id, amount = %amount, currency = %currency, "event: payment reconciled");
            }
            Event::OrderSubmitted { order_id } => {
                info!(order_id = %order_id, "event: order submitted");
            }
            Event::SubscriptionCreated {
                order_id,
                subscription,
            } => {
                info!(
                    order_id = %order_id,
                    subscription_id = %subscription.id,
                    next_order_date = %subscription.next_order_date,
                    "event: subscription created"
                );

                if let (Some(service), Some(url)) = (&webhook_service, &webhook_url) {
                    if let Err(e) = service
                        .send_subscription_created(
                            url,
                            SubscriptionEventData {
                                order_id: order_id.clone(),
                                next_order_date: subscription.next_order_date,
                                subscription: subscription.clone(),
                            },
                        )
                        .await
                    {
                        error!(
                            order_id = %order_id,
                            error = %e,
                            "failed to enqueue subscription notification"
                        );
                    }
                }
            }
        }
    }

    info!("Event processing loop stopped");
}
