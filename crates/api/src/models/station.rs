//! Pickup station model.

use rust_decimal::Decimal;

use duka_core::{Currency, StationId};

/// A pickup location with its own per-currency delivery fee.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PickupStation {
    pub id: StationId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub operating_hours: String,
    pub delivery_fee_usd: Decimal,
    pub delivery_fee_kes: Decimal,
    pub is_active: bool,
}

impl PickupStation {
    /// Delivery fee in the requested currency.
    #[must_use]
    pub const fn fee(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::USD => self.delivery_fee_usd,
            Currency::KES => self.delivery_fee_kes,
        }
    }
}
