use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::clients::{GatewayPaymentMethod, OrderBackendClient, PaymentGatewayClient, PaymentIntent};
use crate::errors::ServiceError;
use crate::models::{Order, Payment, PaymentTransaction, PaymentType};

/// Result of a successful reconciliation: the authoritative payment
/// record plus the gateway objects it was derived from, so downstream
/// steps can reuse them without a second gateway lookup.
pub struct ReconcileOutcome {
    pub payment: Payment,
    pub intent: PaymentIntent,
    pub method: GatewayPaymentMethod,
}

/// Reconciles an order's payment records against the gateway's view of
/// the charge.
///
/// The policy is replace, don't append: all pre-existing payment
/// records are deleted before the single authoritative record is
/// created, so repeated invocations never accumulate stale or
/// duplicate payments.
pub struct PaymentReconciler {
    order_backend: Arc<OrderBackendClient>,
    payment_gateway: Arc<PaymentGatewayClient>,
}

impl PaymentReconciler {
    pub fn new(
        order_backend: Arc<OrderBackendClient>,
        payment_gateway: Arc<PaymentGatewayClient>,
    ) -> Self {
        Self {
            order_backend,
            payment_gateway,
        }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn reconcile(
        &self,
        order: &Order,
        payment_intent_ref: &str,
    ) -> Result<ReconcileOutcome, ServiceError> {
        let intent = self
            .payment_gateway
            .retrieve_payment_intent(payment_intent_ref)
            .await?;

        let method_id = intent.payment_method.as_deref().ok_or_else(|| {
            ServiceError::GatewayLookupError(format!(
                "payment intent {} carries no payment method",
                intent.id
            ))
        })?;
        let method = self.payment_gateway.retrieve_payment_method(method_id).await?;

        if !intent.captured() {
            warn!(
                order_id = %order.id,
                intent_status = %intent.status,
                "reconciling a payment the gateway does not report as captured"
            );
        }

        self.remove_stale_payments(&order.id).await?;

        let now = Utc::now();
        let record = Payment {
            id: None,
            payment_type: PaymentType::CreditCard,
            accepted: true,
            amount: order.total,
            date_created: now,
            transactions: vec![PaymentTransaction {
                amount: intent.amount_major(),
                currency: intent.currency.clone(),
                date_executed: now,
                succeeded: intent.captured(),
                result_code: intent.status.clone(),
                transaction_type: intent.method_type().to_string(),
            }],
        };

        let payment = self.order_backend.create_payment(&order.id, &record).await?;

        info!(
            order_id = %order.id,
            amount = %intent.amount_major(),
            currency = %intent.currency,
            "payment reconciled"
        );

        Ok(ReconcileOutcome {
            payment,
            intent,
            method,
        })
    }

    /// Deletes every existing payment record on the order. The
    /// deletion is non-atomic; the first failure aborts before any new
    /// payment can be created, so the order never shows both an old
    /// and a new charge.
    async fn remove_stale_payments(&self, order_id: &str) -> Result<(), ServiceError> {
        let existing = self.order_backend.list_payments(order_id).await?;

        for stale in existing {
            let payment_id = stale.id.ok_or_else(|| {
                ServiceError::PartialCleanupError(format!(
                    "order {} lists a payment record without an identifier",
                    order_id
                ))
            })?;

            self.order_backend
                .delete_payment(order_id, &payment_id)
                .await
                .map_err(|e| {
                    ServiceError::PartialCleanupError(format!(
                        "failed to delete stale payment {} on order {}: {}",
                        payment_id, order_id, e
                    ))
                })?;

            info!(order_id, payment_id = %payment_id, "stale payment record removed");
        }

        Ok(())
    }
}
