//! Coupon model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use duka_core::{CouponId, DiscountType};

/// A discount code with an activity window and an optional usage cap.
///
/// `used_count` is shared mutable state: it is only ever incremented inside
/// the checkout transaction, with the row locked across re-validation and
/// increment (see `CouponRepository::lock_active`).
#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_value: Decimal,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl Coupon {
    /// Whether the usage cap (if any) has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|cap| self.used_count >= cap)
    }
}
