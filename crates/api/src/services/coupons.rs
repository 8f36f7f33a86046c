//! Coupon eligibility and discount computation.
//!
//! The evaluator is pure: it takes an already-loaded coupon and decides
//! whether it applies to a given total at a given instant. The two call
//! sites differ only in how the coupon row was loaded:
//!
//! - the preview endpoint loads without locking and never touches
//!   `used_count`;
//! - checkout loads with `FOR UPDATE` and increments `used_count` in the
//!   same transaction once the evaluation passes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use duka_core::{Currency, DiscountType};

use crate::models::coupon::Coupon;

/// Why a coupon did not apply.
///
/// Each check failure is a distinct kind so the storefront can render an
/// actionable message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponError {
    /// No active coupon with that code (inactive codes are
    /// indistinguishable from missing ones).
    #[error("coupon code not found")]
    NotFound,

    /// Outside the coupon's validity window.
    #[error("coupon is not currently valid")]
    Expired,

    /// The usage cap has been reached.
    #[error("coupon has reached its usage limit")]
    Exhausted,

    /// The order total is below the coupon's minimum.
    #[error("minimum order value for this coupon is {minimum}")]
    MinimumNotMet { minimum: Decimal },

    /// A fixed-amount coupon denominated in the other currency.
    #[error("coupon does not apply to orders in this currency")]
    CurrencyMismatch,
}

/// Evaluate a coupon against an order total.
///
/// Checks run in order - window, usage cap, minimum, currency - and the
/// first failure wins. On success, returns the discount amount rounded to
/// the order currency's precision. Never mutates usage state.
///
/// # Errors
///
/// Returns the specific [`CouponError`] for the first failed check.
pub fn evaluate(
    coupon: &Coupon,
    cart_total: Decimal,
    currency: Currency,
    now: DateTime<Utc>,
) -> Result<Decimal, CouponError> {
    if now < coupon.valid_from || now > coupon.valid_until {
        return Err(CouponError::Expired);
    }

    if coupon.is_exhausted() {
        return Err(CouponError::Exhausted);
    }

    if cart_total < coupon.min_order_value {
        return Err(CouponError::MinimumNotMet {
            minimum: coupon.min_order_value,
        });
    }

    let discount = match (coupon.discount_type, currency) {
        (DiscountType::Percent, _) => cart_total * coupon.discount_value / Decimal::ONE_HUNDRED,
        (DiscountType::FixedUsd, Currency::USD) | (DiscountType::FixedKes, Currency::KES) => {
            coupon.discount_value
        }
        (DiscountType::FixedUsd | DiscountType::FixedKes, _) => {
            return Err(CouponError::CurrencyMismatch);
        }
    };

    Ok(currency.round(discount))
}

/// Normalize a user-supplied coupon code for lookup.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use duka_core::CouponId;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn coupon(discount_type: DiscountType, value: &str) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: CouponId::new(1),
            code: "SAVE10".to_string(),
            description: "Ten percent off".to_string(),
            discount_type,
            discount_value: dec(value),
            min_order_value: dec("100"),
            max_uses: Some(50),
            used_count: 0,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
        }
    }

    #[test]
    fn test_percent_discount() {
        let coupon = coupon(DiscountType::Percent, "10");
        let discount =
            evaluate(&coupon, dec("250.00"), Currency::USD, Utc::now()).expect("applies");
        assert_eq!(discount, dec("25.00"));
    }

    #[test]
    fn test_percent_discount_rounds_to_currency() {
        let coupon = coupon(DiscountType::Percent, "10");
        let discount = evaluate(&coupon, dec("12345"), Currency::KES, Utc::now()).expect("applies");
        // 1234.5 rounds to whole shillings, away from zero
        assert_eq!(discount, dec("1235"));
    }

    #[test]
    fn test_fixed_discount_matching_currency() {
        let coupon = coupon(DiscountType::FixedKes, "500");
        let discount = evaluate(&coupon, dec("13000"), Currency::KES, Utc::now()).expect("applies");
        assert_eq!(discount, dec("500"));
    }

    #[test]
    fn test_fixed_discount_wrong_currency() {
        let coupon = coupon(DiscountType::FixedUsd, "5");
        let err = evaluate(&coupon, dec("13000"), Currency::KES, Utc::now()).expect_err("rejected");
        assert_eq!(err, CouponError::CurrencyMismatch);
    }

    #[test]
    fn test_expired_before_window() {
        let mut coupon = coupon(DiscountType::Percent, "10");
        coupon.valid_from = Utc::now() + Duration::days(1);
        coupon.valid_until = Utc::now() + Duration::days(2);
        let err = evaluate(&coupon, dec("250"), Currency::USD, Utc::now()).expect_err("rejected");
        assert_eq!(err, CouponError::Expired);
    }

    #[test]
    fn test_expired_after_window() {
        let mut coupon = coupon(DiscountType::Percent, "10");
        coupon.valid_until = Utc::now() - Duration::hours(1);
        let err = evaluate(&coupon, dec("250"), Currency::USD, Utc::now()).expect_err("rejected");
        assert_eq!(err, CouponError::Expired);
    }

    #[test]
    fn test_exhausted() {
        let mut coupon = coupon(DiscountType::Percent, "10");
        coupon.max_uses = Some(3);
        coupon.used_count = 3;
        let err = evaluate(&coupon, dec("250"), Currency::USD, Utc::now()).expect_err("rejected");
        assert_eq!(err, CouponError::Exhausted);
    }

    #[test]
    fn test_uncapped_coupon_never_exhausts() {
        let mut coupon = coupon(DiscountType::Percent, "10");
        coupon.max_uses = None;
        coupon.used_count = 10_000;
        assert!(evaluate(&coupon, dec("250"), Currency::USD, Utc::now()).is_ok());
    }

    #[test]
    fn test_minimum_not_met() {
        let coupon = coupon(DiscountType::Percent, "10");
        let err = evaluate(&coupon, dec("99.99"), Currency::USD, Utc::now()).expect_err("rejected");
        assert_eq!(
            err,
            CouponError::MinimumNotMet {
                minimum: dec("100")
            }
        );
    }

    #[test]
    fn test_window_check_runs_before_cap_check() {
        let mut coupon = coupon(DiscountType::Percent, "10");
        coupon.valid_until = Utc::now() - Duration::hours(1);
        coupon.max_uses = Some(1);
        coupon.used_count = 1;
        // Both fail; the window check is first
        let err = evaluate(&coupon, dec("250"), Currency::USD, Utc::now()).expect_err("rejected");
        assert_eq!(err, CouponError::Expired);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        assert_eq!(normalize_code("Save10"), "SAVE10");
    }
}
