use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::clients::OrderBackendClient;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::payments::PaymentReconciler;
use crate::services::subscriptions::SubscriptionMaterializer;

lazy_static! {
    static ref CHECKOUT_FINALIZATIONS: IntCounter = register_int_counter!(
        "checkout_finalizations_total",
        "Total number of orders finalized and submitted"
    )
    .expect("metric can be created");
    static ref CHECKOUT_GUARD_SKIPS: IntCounter = register_int_counter!(
        "checkout_guard_skips_total",
        "Finalization attempts skipped because the order was not finalizable"
    )
    .expect("metric can be created");
    static ref CHECKOUT_FAILURES: IntCounter = register_int_counter!(
        "checkout_failures_total",
        "Finalization attempts that failed mid-workflow"
    )
    .expect("metric can be created");
}

/// Per-order mutual exclusion for the finalization workflow.
///
/// Two deliveries of the same completion signal (webhook retry racing
/// a browser redirect) must not both pass the status guard. Holding
/// the order's mutex across the whole workflow serializes them; the
/// loser re-reads the order and takes the guard skip path.
struct OrderLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderLocks {
    fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn acquire(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the map entry once no task holds a reference. The check
    /// runs under the shard lock, so it cannot race a concurrent
    /// `acquire` into handing out two different mutexes.
    fn release(&self, order_id: &str) {
        self.locks
            .remove_if(order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Top-level checkout finalization workflow.
///
/// Steps run strictly sequentially: status guard, payment
/// reconciliation, eligibility partition, subscription
/// materialization (when needed), order submission. Fatal errors
/// propagate with side effects in place; there is no compensating
/// rollback. Retries are safe because reconciliation replaces rather
/// than appends and materialization is idempotent by identifier.
pub struct CheckoutService {
    order_backend: Arc<OrderBackendClient>,
    reconciler: PaymentReconciler,
    materializer: SubscriptionMaterializer,
    locks: OrderLocks,
    event_sender: Option<Arc<EventSender>>,
}

impl CheckoutService {
    pub fn new(
        order_backend: Arc<OrderBackendClient>,
        reconciler: PaymentReconciler,
        materializer: SubscriptionMaterializer,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            order_backend,
            reconciler,
            materializer,
            locks: OrderLocks::new(),
            event_sender,
        }
    }

    /// Finalizes the order identified by `order_id` against the charge
    /// identified by `payment_intent_ref`.
    ///
    /// Returns `Ok(true)` when the order was submitted, `Ok(false)`
    /// when it was not in a finalizable state (missing, or any status
    /// other than Unsubmitted) — a non-error outcome with zero writes.
    #[instrument(skip(self))]
    pub async fn finalize(
        &self,
        order_id: &str,
        payment_intent_ref: &str,
    ) -> Result<bool, ServiceError> {
        let lock = self.locks.acquire(order_id);
        let result = {
            let _guard = lock.lock().await;
            self.finalize_locked(order_id, payment_intent_ref).await
        };
        drop(lock);
        self.locks.release(order_id);

        match &result {
            Ok(true) => CHECKOUT_FINALIZATIONS.inc(),
            Ok(false) => CHECKOUT_GUARD_SKIPS.inc(),
            Err(_) => CHECKOUT_FAILURES.inc(),
        }

        result
    }

    async fn finalize_locked(
        &self,
        order_id: &str,
        payment_intent_ref: &str,
    ) -> Result<bool, ServiceError> {
        let order = match self.order_backend.get_order(order_id).await {
            Ok(order) => order,
            Err(ServiceError::NotFound(_)) => {
                info!(order_id, "order not found, nothing to finalize");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if !order.is_finalizable() {
            info!(order_id, status = %order.status, "order not in a finalizable state");
            return Ok(false);
        }

        let outcome = self.reconciler.reconcile(&order, payment_intent_ref).await?;
        self.emit(Event::PaymentReconciled {
            order_id: order.id.clone(),
            amount: outcome.intent.amount_major(),
            currency: outcome.intent.currency.clone(),
        })
        .await;

        let line_items = self.order_backend.list_line_items(order_id).await?;
        let eligible: Vec<_> = line_items
            .into_iter()
            .filter(|item| item.is_subscription_eligible())
            .collect();

        if eligible.is_empty() {
            info!(order_id, "no subscription-eligible line items");
        } else {
            let subscription = self
                .materializer
                .materialize(&order, &eligible, &outcome.intent, &outcome.method)
                .await?;
            self.emit(Event::SubscriptionCreated {
                order_id: order.id.clone(),
                subscription,
            })
            .await;
        }

        self.order_backend.submit_order(order_id).await?;
        self.emit(Event::OrderSubmitted {
            order_id: order.id.clone(),
        })
        .await;

        info!(order_id, "order finalized and submitted");
        Ok(true)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send domain event");
            }
        }
    }
}
