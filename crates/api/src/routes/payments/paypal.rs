//! PayPal payment route handlers.
//!
//! The redirect flow: `create` makes a CAPTURE-intent provider order and
//! hands the frontend an approval URL; after the customer approves and
//! returns, `capture` settles it server-side. Both provider calls happen
//! before any transaction opens.

use axum::{
    Json,
    extract::State,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use duka_core::{Currency, OrderId, PayPalTxStatus, PaymentMethod, PaymentStatus};

use crate::db::orders::OrderRepository;
use crate::db::payments::PayPalTxRepository;
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::order::Order;
use crate::services::money::CurrencyConverter;
use crate::services::payments::PaymentError;
use crate::services::payments::paypal::usd_amount_string;
use crate::state::AppState;

/// Provider order creation request body.
#[derive(Debug, Deserialize)]
pub struct CreatePayload {
    pub order_id: Uuid,
}

/// Provider order creation response.
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub paypal_order_id: String,
    pub approval_url: Option<String>,
}

/// Capture request body.
#[derive(Debug, Deserialize)]
pub struct CapturePayload {
    pub order_id: Uuid,
    pub paypal_order_id: String,
}

/// Capture response.
#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub status: &'static str,
    pub capture_id: String,
}

/// Load an order the caller owns and check it is payable via PayPal.
async fn payable_order(
    state: &AppState,
    identity: &Identity,
    order_id: Uuid,
) -> Result<Order> {
    let order = OrderRepository::new(state.pool())
        .get_owned(OrderId::new(order_id), identity)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    if order.payment_method != PaymentMethod::Paypal {
        return Err(AppError::BadRequest(
            "order is not payable via PayPal".to_string(),
        ));
    }

    Ok(order)
}

/// Create a provider order and return its approval URL.
///
/// The provider wants decimal-string USD amounts, so shilling orders are
/// converted through the stored rate table first.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreatePayload>,
) -> Result<Json<CreateResponse>> {
    let order = payable_order(&state, &identity, payload.order_id).await?;
    if order.payment_status != PaymentStatus::Pending {
        return Err(AppError::BadRequest(
            "order is not awaiting payment".to_string(),
        ));
    }

    let amount_usd = match order.currency {
        Currency::USD => order.total,
        Currency::KES => {
            CurrencyConverter::new(state.pool())
                .convert(order.total, Currency::KES, Currency::USD)
                .await
                .map_err(PaymentError::from)?
        }
    };
    let amount = usd_amount_string(amount_usd);

    let frontend = &state.config().frontend_url;
    let return_url = format!("{frontend}/checkout/success?order={}", order.id);
    let cancel_url = format!("{frontend}/checkout/cancel?order={}", order.id);

    let created = state
        .paypal()
        .create_order(&amount, &order.order_number, &return_url, &cancel_url)
        .await
        .map_err(AppError::Payment)?;

    let now = Utc::now();
    let mut tx = state.pool().begin().await?;

    PayPalTxRepository::insert(
        &mut tx,
        order.id,
        &created.id,
        amount_usd,
        Currency::USD,
        &created.raw,
        now,
    )
    .await?;

    OrderRepository::record_paypal_created(&mut tx, order.id, &created.id, now).await?;

    tx.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        paypal_order_id = %created.id,
        "PayPal order created"
    );

    Ok(Json(CreateResponse {
        paypal_order_id: created.id,
        approval_url: created.approval_url,
    }))
}

/// Capture an approved provider order.
///
/// Re-submitting a capture for an already-completed transaction is a
/// no-op success, not a double-apply: the pre-check answers from our own
/// record without calling the provider, and the post-call transaction
/// re-checks under a row lock before writing.
#[instrument(skip(state, payload))]
pub async fn capture(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CapturePayload>,
) -> Result<Json<CaptureResponse>> {
    let order = payable_order(&state, &identity, payload.order_id).await?;

    let repo = PayPalTxRepository::new(state.pool());
    let record = repo
        .get_by_provider_order_id(&payload.paypal_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("no payment attempt found for this order".to_string()))?;

    if record.order_id != order.id {
        return Err(AppError::BadRequest(
            "payment attempt does not belong to this order".to_string(),
        ));
    }

    if record.status == PayPalTxStatus::Completed {
        // Double-submit of an already-captured payment
        return Ok(Json(CaptureResponse {
            status: "success",
            capture_id: record.capture_id.unwrap_or_default(),
        }));
    }

    let outcome = state
        .paypal()
        .capture_order(&payload.paypal_order_id)
        .await
        .map_err(AppError::Payment)?;

    if !outcome.is_completed() {
        // Order state is untouched; the caller may retry
        return Err(AppError::Payment(PaymentError::Rejected {
            detail: format!("capture returned status {}", outcome.status),
        }));
    }

    let capture_id = outcome.capture_id.clone().ok_or_else(|| {
        AppError::Payment(PaymentError::MalformedResponse(
            "completed capture carried no capture id".to_string(),
        ))
    })?;

    let now = Utc::now();
    let mut tx = state.pool().begin().await?;

    let Some(locked) =
        PayPalTxRepository::lock_by_provider_order_id(&mut tx, &payload.paypal_order_id).await?
    else {
        return Err(AppError::NotFound(
            "no payment attempt found for this order".to_string(),
        ));
    };

    if locked.status != PayPalTxStatus::Completed {
        PayPalTxRepository::record_capture(&mut tx, locked.id, &capture_id, &outcome.raw, now)
            .await?;
        OrderRepository::mark_paid_paypal(&mut tx, order.id, &capture_id, now).await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        capture_id = %capture_id,
        "PayPal payment captured"
    );

    Ok(Json(CaptureResponse {
        status: "success",
        capture_id,
    }))
}
