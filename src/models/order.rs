use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::subscription::SubscriptionInterval;

/// Order lifecycle states as reported by the commerce backend.
///
/// Only `Unsubmitted` is actionable for checkout finalization; every
/// other state (including ones this service does not know about) is
/// terminal from the workflow's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum OrderStatus {
    Unsubmitted,
    Submitted,
    Open,
    AwaitingApproval,
    Declined,
    Completed,
    Canceled,
    /// Any backend-defined state this service does not model.
    #[serde(other)]
    Unknown,
}

/// Condensed subscription snapshot stored in the order's metadata bag
/// once a subscription has been materialized.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrderSubscriptionXp {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Recurrence frequency. The backend stores metadata loosely, so
    /// this accepts a number or a numeric string; anything else reads
    /// as absent and falls back to the configured default.
    #[serde(
        rename = "Frequency",
        default,
        deserialize_with = "lenient_frequency",
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency: Option<u32>,

    /// Interval unit as stored by the cart. Kept as a raw string here;
    /// parsing (and rejection of unknown units) happens when the
    /// subscription is materialized.
    #[serde(rename = "Interval", skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(rename = "Active", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Extensible order metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrderXp {
    #[serde(rename = "Subscription", skip_serializing_if = "Option::is_none")]
    pub subscription: Option<OrderSubscriptionXp>,

    #[serde(rename = "PaymentIntent", skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<String>,
}

/// A checkout transaction record owned by the commerce backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Status")]
    pub status: OrderStatus,

    #[serde(rename = "Total", default)]
    pub total: Decimal,

    #[serde(rename = "FromCompanyID", skip_serializing_if = "Option::is_none")]
    pub from_company_id: Option<String>,

    #[serde(rename = "ToCompanyID", skip_serializing_if = "Option::is_none")]
    pub to_company_id: Option<String>,

    #[serde(rename = "BillingAddressID", skip_serializing_if = "Option::is_none")]
    pub billing_address_id: Option<String>,

    #[serde(rename = "ShippingAddressID", skip_serializing_if = "Option::is_none")]
    pub shipping_address_id: Option<String>,

    #[serde(rename = "SubscriptionID", skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    #[serde(rename = "xp", default)]
    pub xp: OrderXp,
}

impl Order {
    /// Whether the checkout workflow may act on this order at all.
    pub fn is_finalizable(&self) -> bool {
        self.status == OrderStatus::Unsubmitted
    }

    /// Subscription frequency from metadata, if present and positive.
    pub fn subscription_frequency(&self) -> Option<u32> {
        self.xp
            .subscription
            .as_ref()
            .and_then(|s| s.frequency)
            .filter(|f| *f >= 1)
    }

    /// Raw interval unit string from metadata, if present.
    pub fn subscription_interval(&self) -> Option<&str> {
        self.xp
            .subscription
            .as_ref()
            .and_then(|s| s.interval.as_deref())
    }
}

/// Partial order document for `PATCH` requests: the subscription
/// back-reference plus the condensed metadata snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct OrderPatch {
    #[serde(rename = "SubscriptionID")]
    pub subscription_id: String,

    #[serde(rename = "xp")]
    pub xp: OrderXp,
}

impl OrderPatch {
    pub fn link_subscription(
        subscription_id: &str,
        frequency: u32,
        interval: SubscriptionInterval,
        active: bool,
    ) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            xp: OrderXp {
                subscription: Some(OrderSubscriptionXp {
                    id: Some(subscription_id.to_string()),
                    frequency: Some(frequency),
                    interval: Some(interval.to_string()),
                    active: Some(active),
                }),
                payment_intent: None,
            },
        }
    }
}

/// Accepts a frequency stored as a JSON number or as a numeric string.
/// Non-numeric and non-positive values read as `None`.
fn lenient_frequency<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
    .filter(|f| *f >= 1))
}
