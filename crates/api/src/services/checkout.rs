//! Checkout orchestration: converts a cart into an immutable order.
//!
//! The money math is pure ([`OrderTotals::compute`]); everything that
//! touches state runs inside one transaction so an order can never be
//! half-created: order row, frozen items, coupon increment, and cart
//! clearing land together or not at all.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use duka_core::{
    CartItemId, Currency, DeliveryType, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, StationId,
};

use crate::db::RepositoryError;
use crate::db::carts::{CartRepository, CheckoutLineRow};
use crate::db::coupons::CouponRepository;
use crate::db::orders::OrderRepository;
use crate::db::stations::StationRepository;
use crate::middleware::Identity;
use crate::models::cart::{CartLine, CartTotals};
use crate::models::order::{Order, OrderItem};
use crate::services::coupons::{self, CouponError};

/// VAT applied to the cart subtotal.
const TAX_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2); // 0.16

/// Flat home-delivery fee per currency.
const HOME_DELIVERY_FEE_USD: Decimal = Decimal::from_parts(300, 0, 0, false, 2); // 3.00
const HOME_DELIVERY_FEE_KES: Decimal = Decimal::from_parts(350, 0, 0, false, 0); // 350

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists. The whole
    /// checkout is rejected rather than silently dropping the line.
    #[error("cart item {item} references a product that no longer exists")]
    UnresolvableItem { item: CartItemId },

    /// Pickup delivery was chosen without a station.
    #[error("pickup delivery requires a pickup station")]
    StationRequired,

    /// The chosen pickup station does not exist or is inactive.
    #[error("pickup station not found")]
    StationNotFound,

    /// The supplied coupon did not apply; checkout is all-or-nothing with
    /// respect to a coupon.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validated checkout input, already lifted out of the wire shape.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub currency: Currency,
    pub delivery_type: DeliveryType,
    pub pickup_station_id: Option<StationId>,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub coupon_code: Option<String>,
    pub notes: String,
}

/// The four stored money fields plus the derived total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute order totals in the checkout currency.
    ///
    /// `total = subtotal + shipping_fee + tax - discount`, with every field
    /// rounded to the currency's precision and the discount clamped to the
    /// gross amount so the total can never go negative.
    #[must_use]
    pub fn compute(
        subtotal: Decimal,
        shipping_fee: Decimal,
        discount: Decimal,
        currency: Currency,
    ) -> Self {
        let subtotal = currency.round(subtotal);
        let shipping_fee = currency.round(shipping_fee);
        let tax = currency.round(subtotal * TAX_RATE);
        let gross = subtotal + shipping_fee + tax;
        let discount = currency.round(discount).min(gross);

        Self {
            subtotal,
            shipping_fee,
            tax,
            discount,
            total: gross - discount,
        }
    }
}

/// Apply the checkout resolvability policy to the locked cart lines.
fn resolve_lines(rows: Vec<CheckoutLineRow>) -> Result<Vec<CartLine>, CheckoutError> {
    rows.into_iter()
        .map(|row| {
            let (Some(product_name), Some(sku), Some(unit_price_usd), Some(unit_price_kes)) = (
                row.product_name,
                row.sku,
                row.unit_price_usd,
                row.unit_price_kes,
            ) else {
                return Err(CheckoutError::UnresolvableItem { item: row.id });
            };

            Ok(CartLine {
                id: row.id,
                product_id: row.product_id,
                variant_id: row.variant_id,
                quantity: row.quantity,
                product_name,
                variant_name: row.variant_name,
                sku,
                unit_price_usd,
                unit_price_kes,
            })
        })
        .collect()
}

/// The checkout orchestrator.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Convert the caller's cart into an order, exactly once.
    ///
    /// The sequence inside the transaction:
    ///
    /// 1. lock the cart lines and re-resolve their prices,
    /// 2. lock, re-validate, and redeem the coupon (if any),
    /// 3. insert the order and its frozen items,
    /// 4. empty the cart.
    ///
    /// The shipping fee is resolved before the transaction opens - it is a
    /// read-only lookup and needs no lock.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] naming the first failed precondition;
    /// nothing is written unless the whole sequence succeeds.
    pub async fn checkout(
        &self,
        identity: &Identity,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<(Order, Vec<OrderItem>), CheckoutError> {
        let currency = request.currency;

        let shipping_fee = self.resolve_shipping_fee(&request, currency).await?;

        let cart = CartRepository::new(self.pool)
            .get_or_create(identity, now)
            .await?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let lines = resolve_lines(CartRepository::lines_for_checkout(&mut tx, cart.id).await?)?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal = CartTotals::compute(&lines, currency).subtotal;

        let mut discount = Decimal::ZERO;
        if let Some(raw_code) = request
            .coupon_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
        {
            let code = coupons::normalize_code(raw_code);
            let coupon = CouponRepository::lock_active(&mut tx, &code)
                .await?
                .ok_or(CouponError::NotFound)?;

            discount = coupons::evaluate(&coupon, subtotal, currency, now)?;
            CouponRepository::increment_usage(&mut tx, coupon.id).await?;
        }

        let totals = OrderTotals::compute(subtotal, shipping_fee, discount, currency);

        let order = Order {
            id: OrderId::generate(),
            order_number: Order::generate_number(),
            user_id: identity.user_id(),
            session_token: identity.session_token().cloned(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            currency,
            full_name: request.full_name,
            email: request.email,
            phone: request.phone,
            delivery_type: request.delivery_type,
            pickup_station_id: request.pickup_station_id,
            shipping_address: request.shipping_address,
            shipping_city: request.shipping_city,
            shipping_postal_code: request.shipping_postal_code,
            subtotal: totals.subtotal,
            shipping_fee: totals.shipping_fee,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            mpesa_checkout_request_id: None,
            mpesa_receipt: None,
            mpesa_phone: None,
            paypal_order_id: None,
            paypal_capture_id: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        OrderRepository::insert(&mut tx, &order).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let mut item = OrderItem {
                id: OrderItemId::new(0), // replaced with the assigned id below
                order_id: order.id,
                product_id: Some(line.product_id),
                variant_id: line.variant_id,
                product_name: line.product_name.clone(),
                variant_name: line.variant_name.clone(),
                sku: line.sku.clone(),
                unit_price: currency.round(line.unit_price(currency)),
                quantity: line.quantity,
                currency,
            };
            item.id = OrderRepository::insert_item(&mut tx, &item).await?;
            items.push(item);
        }

        CartRepository::clear_in_tx(&mut tx, cart.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            currency = %order.currency,
            "order created"
        );

        Ok((order, items))
    }

    /// Resolve the shipping fee for the chosen delivery option.
    async fn resolve_shipping_fee(
        &self,
        request: &CheckoutRequest,
        currency: Currency,
    ) -> Result<Decimal, CheckoutError> {
        match request.delivery_type {
            DeliveryType::Home => Ok(match currency {
                Currency::USD => HOME_DELIVERY_FEE_USD,
                Currency::KES => HOME_DELIVERY_FEE_KES,
            }),
            DeliveryType::Pickup => {
                let station_id = request
                    .pickup_station_id
                    .ok_or(CheckoutError::StationRequired)?;
                let station = StationRepository::new(self.pool)
                    .get_active(station_id)
                    .await?
                    .ok_or(CheckoutError::StationNotFound)?;
                Ok(station.fee(currency))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::ProductId;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    #[test]
    fn test_tax_rate_constant() {
        assert_eq!(TAX_RATE, dec("0.16"));
        assert_eq!(HOME_DELIVERY_FEE_USD, dec("3.00"));
        assert_eq!(HOME_DELIVERY_FEE_KES, dec("350"));
    }

    #[test]
    fn test_worked_usd_scenario() {
        // 2 x $100 + 1 x $50, 10% coupon, home delivery
        let totals = OrderTotals::compute(dec("250.00"), dec("3.00"), dec("25.00"), Currency::USD);
        assert_eq!(totals.subtotal, dec("250.00"));
        assert_eq!(totals.shipping_fee, dec("3.00"));
        assert_eq!(totals.tax, dec("40.00"));
        assert_eq!(totals.discount, dec("25.00"));
        assert_eq!(totals.total, dec("268.00"));
    }

    #[test]
    fn test_total_identity_holds() {
        let totals = OrderTotals::compute(dec("131.37"), dec("3.00"), dec("10.00"), Currency::USD);
        assert_eq!(
            totals.total,
            totals.subtotal + totals.shipping_fee + totals.tax - totals.discount
        );
    }

    #[test]
    fn test_discount_clamped_so_total_never_negative() {
        // A fixed coupon larger than the whole order
        let totals = OrderTotals::compute(dec("10.00"), dec("3.00"), dec("500.00"), Currency::USD);
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.discount, dec("14.60")); // clamped to subtotal + shipping + tax
    }

    #[test]
    fn test_kes_totals_round_to_whole_shillings() {
        let totals = OrderTotals::compute(dec("12997"), dec("350"), dec("0"), Currency::KES);
        // tax = 12997 * 0.16 = 2079.52 -> 2080
        assert_eq!(totals.tax, dec("2080"));
        assert_eq!(totals.total, dec("15427"));
    }

    #[test]
    fn test_zero_discount_without_coupon() {
        let totals = OrderTotals::compute(dec("100.00"), dec("3.00"), Decimal::ZERO, Currency::USD);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, dec("119.00"));
    }

    fn row(id: i64, resolved: bool) -> CheckoutLineRow {
        CheckoutLineRow {
            id: CartItemId::new(id),
            product_id: ProductId::generate(),
            variant_id: None,
            quantity: 1,
            product_name: resolved.then(|| "Item".to_string()),
            variant_name: None,
            sku: resolved.then(|| "SKU".to_string()),
            unit_price_usd: resolved.then(|| dec("10.00")),
            unit_price_kes: resolved.then(|| dec("1300")),
        }
    }

    #[test]
    fn test_resolve_lines_accepts_fully_resolved_rows() {
        let lines = resolve_lines(vec![row(1, true), row(2, true)]).expect("resolved");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.first().map(|l| l.quantity), Some(1));
    }

    #[test]
    fn test_resolve_lines_rejects_vanished_product() {
        let err = resolve_lines(vec![row(1, true), row(2, false)]).expect_err("rejected");
        match err {
            CheckoutError::UnresolvableItem { item } => assert_eq!(item, CartItemId::new(2)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
