//! Currency conversion over the stored rate table.
//!
//! Rates live in the `exchange_rate` table and are refreshed by an external
//! job. Conversion is a lookup and a multiply; results are rounded to the
//! target currency's precision. A missing pair is a hard error - callers
//! must never fall back to a silent 1:1 rate.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use duka_core::Currency;

use crate::db::RepositoryError;
use crate::db::rates::RateRepository;

/// Errors from currency conversion.
#[derive(Debug, Error)]
pub enum MoneyError {
    /// No stored rate for the requested currency pair.
    #[error("no exchange rate stored for {from} -> {to}")]
    RateNotFound { from: Currency, to: Currency },

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Converts amounts between the supported currencies.
pub struct CurrencyConverter<'a> {
    rates: RateRepository<'a>,
}

impl<'a> CurrencyConverter<'a> {
    /// Create a new converter backed by the stored rate table.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            rates: RateRepository::new(pool),
        }
    }

    /// Convert an amount between currencies, rounding to the target
    /// currency's precision.
    ///
    /// Same-currency conversion is the identity (plus rounding) and needs
    /// no stored rate.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::RateNotFound` if no rate is stored for the
    /// pair, `MoneyError::Repository` if the lookup fails.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
    ) -> Result<Decimal, MoneyError> {
        if from == to {
            return Ok(to.round(amount));
        }

        let rate = self
            .rates
            .rate(from, to)
            .await?
            .ok_or(MoneyError::RateNotFound { from, to })?;

        Ok(to.round(amount * rate))
    }
}
