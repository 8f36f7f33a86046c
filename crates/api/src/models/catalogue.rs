//! Catalogue read models.
//!
//! The catalogue itself (browsing, search, media, stock management) is owned
//! by another service. These models exist so the cart and checkout can
//! resolve references and read current prices.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use duka_core::{Currency, ProductId, VariantId};

/// A catalogue product with prices in both supported currencies.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub price_usd: Decimal,
    pub sale_price_usd: Option<Decimal>,
    pub price_kes: Decimal,
    pub sale_price_kes: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Current effective price: sale price if set, else regular price.
    #[must_use]
    pub fn effective_price(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::USD => self.sale_price_usd.unwrap_or(self.price_usd),
            Currency::KES => self.sale_price_kes.unwrap_or(self.price_kes),
        }
    }
}

/// A product variant with optional price overrides.
///
/// A variant without its own prices inherits the parent product's effective
/// price.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub price_usd: Option<Decimal>,
    pub sale_price_usd: Option<Decimal>,
    pub price_kes: Option<Decimal>,
    pub sale_price_kes: Option<Decimal>,
    pub stock: i32,
    pub is_active: bool,
}

impl ProductVariant {
    /// Current effective price: variant sale price, else variant price,
    /// else the parent product's effective price.
    #[must_use]
    pub fn effective_price(&self, currency: Currency, product: &Product) -> Decimal {
        let own = match currency {
            Currency::USD => self.sale_price_usd.or(self.price_usd),
            Currency::KES => self.sale_price_kes.or(self.price_kes),
        };
        own.unwrap_or_else(|| product.effective_price(currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn product() -> Product {
        Product {
            id: ProductId::generate(),
            name: "Wireless Earbuds".to_string(),
            slug: "wireless-earbuds".to_string(),
            sku: "DKA-EB01".to_string(),
            price_usd: dec("100.00"),
            sale_price_usd: None,
            price_kes: dec("13000"),
            sale_price_kes: Some(dec("12500")),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn variant(product: &Product) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(1),
            product_id: product.id,
            name: "Black".to_string(),
            sku: "DKA-EB01-BLK".to_string(),
            price_usd: None,
            sale_price_usd: None,
            price_kes: None,
            sale_price_kes: None,
            stock: 5,
            is_active: true,
        }
    }

    #[test]
    fn test_product_prefers_sale_price() {
        let product = product();
        assert_eq!(product.effective_price(Currency::USD), dec("100.00"));
        assert_eq!(product.effective_price(Currency::KES), dec("12500"));
    }

    #[test]
    fn test_variant_without_prices_inherits_product() {
        let product = product();
        let variant = variant(&product);
        assert_eq!(variant.effective_price(Currency::USD, &product), dec("100.00"));
        assert_eq!(variant.effective_price(Currency::KES, &product), dec("12500"));
    }

    #[test]
    fn test_variant_sale_price_wins_over_variant_price() {
        let product = product();
        let mut variant = variant(&product);
        variant.price_usd = Some(dec("110.00"));
        variant.sale_price_usd = Some(dec("95.00"));
        assert_eq!(variant.effective_price(Currency::USD, &product), dec("95.00"));
    }

    #[test]
    fn test_variant_price_wins_over_product() {
        let product = product();
        let mut variant = variant(&product);
        variant.price_kes = Some(dec("14000"));
        assert_eq!(variant.effective_price(Currency::KES, &product), dec("14000"));
    }
}
