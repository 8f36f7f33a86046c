//! Cart models and live totals.
//!
//! A cart stores only references and quantities. Unit prices are resolved
//! from the catalogue at read time so totals always reflect current pricing,
//! never a stale snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use duka_core::{CartId, CartItemId, Currency, ProductId, SessionToken, UserId, VariantId};

/// A cart owned by exactly one of a signed-in user or an anonymous session.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
    pub session_token: Option<SessionToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line with its unit price resolved live from the catalogue.
///
/// The price fallback chain (variant sale -> variant price -> product sale ->
/// product price) is applied by the loading query, per currency.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub unit_price_usd: Decimal,
    pub unit_price_kes: Decimal,
}

impl CartLine {
    /// Unit price in the requested currency.
    #[must_use]
    pub const fn unit_price(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::USD => self.unit_price_usd,
            Currency::KES => self.unit_price_kes,
        }
    }

    /// Line total (unit price x quantity) in the requested currency.
    #[must_use]
    pub fn line_total(&self, currency: Currency) -> Decimal {
        self.unit_price(currency) * Decimal::from(self.quantity)
    }
}

/// Computed cart totals in a single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub item_count: i64,
}

impl CartTotals {
    /// Sum the given lines in the requested currency.
    ///
    /// The subtotal is rounded to the currency's precision; the item count
    /// sums quantities, not lines.
    #[must_use]
    pub fn compute(lines: &[CartLine], currency: Currency) -> Self {
        let subtotal = lines
            .iter()
            .map(|line| line.line_total(currency))
            .sum::<Decimal>();
        let item_count = lines.iter().map(|line| i64::from(line.quantity)).sum();

        Self {
            subtotal: currency.round(subtotal),
            item_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn line(quantity: i32, usd: &str, kes: &str) -> CartLine {
        CartLine {
            id: CartItemId::new(1),
            product_id: ProductId::generate(),
            variant_id: None,
            quantity,
            product_name: "Item".to_string(),
            variant_name: None,
            sku: "SKU".to_string(),
            unit_price_usd: dec(usd),
            unit_price_kes: dec(kes),
        }
    }

    #[test]
    fn test_empty_cart_totals() {
        let totals = CartTotals::compute(&[], Currency::USD);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.item_count, 0);
    }

    #[test]
    fn test_totals_sum_quantities_and_line_totals() {
        let lines = vec![line(2, "100.00", "13000"), line(1, "50.00", "6500")];
        let totals = CartTotals::compute(&lines, Currency::USD);
        assert_eq!(totals.subtotal, dec("250.00"));
        assert_eq!(totals.item_count, 3);

        let totals_kes = CartTotals::compute(&lines, Currency::KES);
        assert_eq!(totals_kes.subtotal, dec("32500"));
    }

    #[test]
    fn test_totals_round_to_currency_precision() {
        let lines = vec![line(3, "9.999", "1299.4")];
        let totals = CartTotals::compute(&lines, Currency::USD);
        // 3 x 9.999 = 29.997 -> 30.00
        assert_eq!(totals.subtotal, dec("30.00"));

        let totals_kes = CartTotals::compute(&lines, Currency::KES);
        // 3 x 1299.4 = 3898.2 -> 3898
        assert_eq!(totals_kes.subtotal, dec("3898"));
    }
}
