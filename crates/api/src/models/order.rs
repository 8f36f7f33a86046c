//! Order and order item models.
//!
//! An order is an immutable snapshot taken at checkout: contact details,
//! delivery choice, and four independently stored money fields. Order items
//! freeze the product name, variant name, SKU, and unit price so the order
//! stays accurate even if the catalogue later changes.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use duka_core::{
    Currency, DeliveryType, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, SessionToken, StationId, UserId, VariantId,
};

/// A customer order.
///
/// `total` is always derived as `subtotal + shipping_fee + tax - discount`;
/// it is stored for querying but never edited independently.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub session_token: Option<SessionToken>,

    // Status axes
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub currency: Currency,

    // Customer details
    pub full_name: String,
    pub email: String,
    pub phone: String,

    // Delivery
    pub delivery_type: DeliveryType,
    pub pickup_station_id: Option<StationId>,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,

    // Financials
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,

    // Provider references
    pub mpesa_checkout_request_id: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub mpesa_phone: Option<String>,
    pub paypal_order_id: Option<String>,
    pub paypal_capture_id: Option<String>,

    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Generate a human-facing order number: `DKA-` plus ten digits.
    #[must_use]
    pub fn generate_number() -> String {
        let mut rng = rand::rng();
        let digits: String = (0..10)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        format!("DKA-{digits}")
    }
}

/// A line frozen onto an order at checkout time.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub currency: Currency,
}

impl OrderItem {
    /// Line total (frozen unit price x quantity).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        let number = Order::generate_number();
        assert!(number.starts_with("DKA-"));
        assert_eq!(number.len(), 14);
        assert!(number.chars().skip(4).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_numbers_vary() {
        let numbers: std::collections::HashSet<String> =
            (0..32).map(|_| Order::generate_number()).collect();
        assert!(numbers.len() > 1);
    }

    #[test]
    fn test_item_subtotal() {
        let item = OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::generate(),
            product_id: None,
            variant_id: None,
            product_name: "Item".to_string(),
            variant_name: None,
            sku: "SKU".to_string(),
            unit_price: "100.00".parse().expect("decimal"),
            quantity: 2,
            currency: Currency::USD,
        };
        assert_eq!(item.subtotal(), "200.00".parse::<Decimal>().expect("decimal"));
    }
}
