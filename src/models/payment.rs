use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment instrument category. The checkout workflow only produces
/// card-style payments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PaymentType {
    CreditCard,
    PurchaseOrder,
    SpendingAccount,
}

/// One gateway transaction recorded under a payment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentTransaction {
    #[serde(rename = "Amount")]
    pub amount: Decimal,

    #[serde(rename = "Currency")]
    pub currency: String,

    #[serde(rename = "DateExecuted")]
    pub date_executed: DateTime<Utc>,

    #[serde(rename = "Succeeded")]
    pub succeeded: bool,

    /// Gateway status string for the charge attempt
    #[serde(rename = "ResultCode")]
    pub result_code: String,

    /// Payment-method type as reported by the gateway
    #[serde(rename = "Type")]
    pub transaction_type: String,
}

/// One logical payment attached to an order. The reconciler keeps the
/// invariant that at most one of these represents the final charge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    /// Backend-assigned identifier; absent on create requests.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "Type")]
    pub payment_type: PaymentType,

    #[serde(rename = "Accepted")]
    pub accepted: bool,

    #[serde(rename = "Amount")]
    pub amount: Decimal,

    #[serde(rename = "DateCreated")]
    pub date_created: DateTime<Utc>,

    #[serde(rename = "Transactions", default)]
    pub transactions: Vec<PaymentTransaction>,
}
