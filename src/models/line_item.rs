use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Line-item metadata. `Subscription` is the cart-time eligibility
/// flag: items carrying it are copied into the recurring-order
/// template at checkout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineItemXp {
    #[serde(rename = "Subscription", default)]
    pub subscription: bool,
}

/// A purchased product line on an order. Read-only for the checkout
/// workflow apart from the eligibility partition it performs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "ProductID")]
    pub product_id: String,

    #[serde(rename = "Quantity")]
    pub quantity: i32,

    #[serde(rename = "UnitPrice", default)]
    pub unit_price: Decimal,

    #[serde(rename = "LineTotal", default)]
    pub line_total: Decimal,

    #[serde(rename = "xp", default)]
    pub xp: LineItemXp,
}

impl LineItem {
    pub fn is_subscription_eligible(&self) -> bool {
        self.xp.subscription
    }
}

/// Paged list envelope used by the backend's list endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListPage<T> {
    #[serde(rename = "Items")]
    pub items: Vec<T>,
}
