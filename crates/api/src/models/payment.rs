//! Payment transaction models.
//!
//! Each row is an append-only record of a single payment attempt against one
//! order. An order may accumulate several attempts (retries), but only one
//! should ever reach a terminal paid status. Raw provider payloads are
//! persisted alongside for audit and are not loaded into these models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use duka_core::{Currency, MpesaTxId, MpesaTxStatus, OrderId, PayPalTxId, PayPalTxStatus};

/// One M-Pesa STK push attempt, keyed by the provider's checkout request id.
#[derive(Debug, Clone)]
pub struct MpesaTransaction {
    pub id: MpesaTxId,
    pub order_id: OrderId,
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    pub amount: Decimal,
    pub phone: String,
    pub status: MpesaTxStatus,
    pub result_code: Option<String>,
    pub result_desc: Option<String>,
    pub receipt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One PayPal order/capture attempt, keyed by the provider's order id.
#[derive(Debug, Clone)]
pub struct PayPalTransaction {
    pub id: PayPalTxId,
    pub order_id: OrderId,
    pub paypal_order_id: String,
    pub capture_id: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PayPalTxStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
