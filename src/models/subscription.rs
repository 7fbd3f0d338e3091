use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::ServiceError;

/// Calendar granularity of a recurring order.
///
/// The set is closed: anything else arriving as a string (order
/// metadata, configuration) must go through `FromStr`, which rejects
/// unknown units instead of silently skipping the date advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum SubscriptionInterval {
    Days,
    Weeks,
    Months,
}

impl FromStr for SubscriptionInterval {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Days" => Ok(Self::Days),
            "Weeks" => Ok(Self::Weeks),
            "Months" => Ok(Self::Months),
            other => Err(ServiceError::ValidationError(format!(
                "unrecognized subscription interval '{}', expected Days, Weeks or Months",
                other
            ))),
        }
    }
}

/// Gateway references stored on a subscription so future recurring
/// charges can reuse the buyer's payment method.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionXp {
    /// Reusable gateway token
    #[serde(rename = "Token", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Gateway payment-method identifier
    #[serde(rename = "PaymentMethodId", skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,

    /// Gateway customer identifier
    #[serde(rename = "CustomerId", skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// A recurring-order template owned by the commerce backend, created
/// at most once per originating order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "FromCompanyID", skip_serializing_if = "Option::is_none")]
    pub from_company_id: Option<String>,

    #[serde(rename = "ToCompanyID", skip_serializing_if = "Option::is_none")]
    pub to_company_id: Option<String>,

    #[serde(rename = "BillingAddressID", skip_serializing_if = "Option::is_none")]
    pub billing_address_id: Option<String>,

    #[serde(rename = "ShippingAddressID", skip_serializing_if = "Option::is_none")]
    pub shipping_address_id: Option<String>,

    #[serde(rename = "Frequency")]
    pub frequency: u32,

    #[serde(rename = "Interval")]
    pub interval: SubscriptionInterval,

    #[serde(rename = "NextOrderDate")]
    pub next_order_date: DateTime<Utc>,

    #[serde(rename = "Active", default)]
    pub active: bool,

    #[serde(rename = "xp", default)]
    pub xp: SubscriptionXp,
}

impl Subscription {
    /// Deterministic subscription identifier for an order. Retries of
    /// the checkout workflow land on the same identifier, so the
    /// backend's uniqueness constraint is what makes creation
    /// idempotent.
    pub fn id_for_order(order_id: &str) -> String {
        format!("S{}", order_id)
    }
}
