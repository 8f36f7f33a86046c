//! M-Pesa payment route handlers.
//!
//! The push flow: `initiate` converts the order total to whole shillings,
//! asks the provider to prompt the customer's phone, records the attempt,
//! and moves the order to `payment_pending`. The outcome arrives later on
//! the unauthenticated `callback` webhook; the poll endpoint lets the
//! frontend watch the order's status axes meanwhile.
//!
//! The webhook payload is untrusted by provider design: the only thing
//! binding it to anything is the stored `CheckoutRequestID`, and the only
//! effect an unmatched or repeated delivery can have is a log line.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use duka_core::{Currency, MpesaTxStatus, OrderId, OrderStatus, PaymentMethod, PaymentStatus};

use crate::db::orders::OrderRepository;
use crate::db::payments::MpesaTxRepository;
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::order::Order;
use crate::services::money::CurrencyConverter;
use crate::services::payments::mpesa::{self, whole_kes};
use crate::state::AppState;

/// STK push request body.
#[derive(Debug, Deserialize)]
pub struct InitiatePayload {
    pub order_id: Uuid,
    pub phone: String,
}

/// STK push response.
#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub message: String,
    pub checkout_request_id: String,
    pub customer_message: Option<String>,
}

/// Status poll response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

/// Webhook acknowledgment, shaped the way the provider expects.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: &'static str,
}

impl CallbackAck {
    const fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted",
        }
    }
}

/// Load an order the caller owns and check it is payable via M-Pesa.
async fn payable_order(
    state: &AppState,
    identity: &Identity,
    order_id: Uuid,
) -> Result<Order> {
    let order = OrderRepository::new(state.pool())
        .get_owned(OrderId::new(order_id), identity)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    if order.payment_method != PaymentMethod::Mpesa {
        return Err(AppError::BadRequest(
            "order is not payable via M-Pesa".to_string(),
        ));
    }
    if order.payment_status != PaymentStatus::Pending {
        return Err(AppError::BadRequest(
            "order is not awaiting payment".to_string(),
        ));
    }

    Ok(order)
}

/// Initiate an STK push for an order.
///
/// The provider call happens first, with no transaction held - provider
/// latency must never extend a lock. Only once the push is accepted do we
/// open a transaction to record the attempt and advance the order.
#[instrument(skip(state, payload))]
pub async fn initiate(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<InitiatePayload>,
) -> Result<Json<InitiateResponse>> {
    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone is required".to_string()));
    }

    let order = payable_order(&state, &identity, payload.order_id).await?;

    // The provider takes whole-shilling integers only
    let amount_kes = match order.currency {
        Currency::KES => order.total,
        Currency::USD => {
            CurrencyConverter::new(state.pool())
                .convert(order.total, Currency::USD, Currency::KES)
                .await
                .map_err(crate::services::payments::PaymentError::from)?
        }
    };
    let amount = whole_kes(amount_kes).map_err(AppError::Payment)?;

    let now = Utc::now();
    let push = state
        .mpesa()
        .initiate(
            amount,
            &payload.phone,
            &order.order_number,
            &format!("Payment for {}", order.order_number),
            now,
        )
        .await
        .map_err(AppError::Payment)?;

    let mut tx = state.pool().begin().await?;

    MpesaTxRepository::insert(
        &mut tx,
        order.id,
        &push.checkout_request_id,
        push.merchant_request_id.as_deref(),
        amount.into(),
        &payload.phone,
        now,
    )
    .await?;

    OrderRepository::record_mpesa_initiated(
        &mut tx,
        order.id,
        &push.checkout_request_id,
        &payload.phone,
        now,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        checkout_request_id = %push.checkout_request_id,
        "STK push issued"
    );

    Ok(Json(InitiateResponse {
        message: "STK push sent. Check your phone.".to_string(),
        checkout_request_id: push.checkout_request_id,
        customer_message: push.customer_message,
    }))
}

/// Provider confirmation webhook (unauthenticated by provider design).
///
/// The transaction row is locked for the whole read-check-write sequence,
/// so a retried delivery either finds the row no longer `pending` and
/// no-ops, or queues behind the first delivery. Unknown request ids are
/// logged and acknowledged - the provider only wants a 200, and we cannot
/// recover a transaction we never issued. The raw payload is persisted on
/// the matched transaction for audit.
#[instrument(skip(state, payload))]
pub async fn callback(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<CallbackAck>> {
    let Ok(callback) = mpesa::parse_callback(&payload) else {
        tracing::warn!("M-Pesa callback with unrecognized shape, acknowledging");
        return Ok(Json(CallbackAck::accepted()));
    };

    let mut tx = state.pool().begin().await?;

    let Some(record) =
        MpesaTxRepository::lock_by_checkout_request_id(&mut tx, &callback.checkout_request_id)
            .await?
    else {
        tracing::warn!(
            checkout_request_id = %callback.checkout_request_id,
            "M-Pesa callback for unknown transaction, acknowledging"
        );
        return Ok(Json(CallbackAck::accepted()));
    };

    if record.status != MpesaTxStatus::Pending {
        // Retried delivery of an already-settled callback
        tracing::info!(
            checkout_request_id = %callback.checkout_request_id,
            status = %record.status,
            "M-Pesa callback replay ignored"
        );
        return Ok(Json(CallbackAck::accepted()));
    }

    let now = Utc::now();
    let result_code = callback.result_code.to_string();

    if callback.is_success() {
        let receipt = callback.receipt_number().unwrap_or_default();

        MpesaTxRepository::record_result(
            &mut tx,
            record.id,
            MpesaTxStatus::Success,
            &result_code,
            &callback.result_desc,
            Some(&receipt),
            &payload,
            now,
        )
        .await?;

        OrderRepository::mark_paid_mpesa(&mut tx, record.order_id, &receipt, now).await?;

        tracing::info!(
            checkout_request_id = %callback.checkout_request_id,
            receipt = %receipt,
            "M-Pesa payment confirmed"
        );
    } else {
        // Failed attempt: the transaction settles, the order stays payable
        MpesaTxRepository::record_result(
            &mut tx,
            record.id,
            MpesaTxStatus::Failed,
            &result_code,
            &callback.result_desc,
            None,
            &payload,
            now,
        )
        .await?;

        tracing::info!(
            checkout_request_id = %callback.checkout_request_id,
            result_code = %result_code,
            "M-Pesa payment failed"
        );
    }

    tx.commit().await?;

    Ok(Json(CallbackAck::accepted()))
}

/// Poll an order's status axes while waiting for the confirmation.
#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<StatusResponse>> {
    let order = OrderRepository::new(state.pool())
        .get_owned(OrderId::new(order_id), &identity)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    Ok(Json(StatusResponse {
        payment_status: order.payment_status,
        status: order.status,
    }))
}
