//! Coupon preview route handler.
//!
//! Validation-only: tells the storefront what a code would be worth against
//! a given total without redeeming it. Usage is only ever incremented inside
//! the checkout transaction.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use duka_core::{Currency, DiscountType};

use crate::db::coupons::CouponRepository;
use crate::error::Result;
use crate::middleware::Identity;
use crate::services::coupons::{self, CouponError};
use crate::state::AppState;

/// Coupon preview request body.
#[derive(Debug, Deserialize)]
pub struct ValidatePayload {
    pub code: String,
    pub cart_total: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

/// Coupon preview response.
#[derive(Debug, Serialize)]
pub struct CouponPreviewResponse {
    pub valid: bool,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub description: String,
}

/// Validate a coupon code against a total without applying it.
#[instrument(skip(state), fields(currency = %payload.currency))]
pub async fn validate(
    State(state): State<AppState>,
    _identity: Identity,
    Json(payload): Json<ValidatePayload>,
) -> Result<Json<CouponPreviewResponse>> {
    let code = coupons::normalize_code(&payload.code);

    let coupon = CouponRepository::new(state.pool())
        .find_active(&code)
        .await?
        .ok_or(CouponError::NotFound)?;

    let discount = coupons::evaluate(
        &coupon,
        payload.cart_total,
        payload.currency,
        chrono::Utc::now(),
    )?;

    Ok(Json(CouponPreviewResponse {
        valid: true,
        discount,
        discount_type: coupon.discount_type,
        discount_value: coupon.discount_value,
        description: coupon.description,
    }))
}
