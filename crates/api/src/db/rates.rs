//! Exchange rate repository (read-only).
//!
//! The rate table is refreshed by an external job; this service only looks
//! pairs up. A missing pair is surfaced to callers as an error, never
//! defaulted to 1:1.

use rust_decimal::Decimal;
use sqlx::PgPool;

use duka_core::Currency;

use super::RepositoryError;

/// Read-only access to stored exchange rates.
pub struct RateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RateRepository<'a> {
    /// Create a new rate repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up the multiplier for an ordered currency pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rate(
        &self,
        from: Currency,
        to: Currency,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let rate = sqlx::query_scalar::<_, Decimal>(
            r"
            SELECT rate
            FROM exchange_rate
            WHERE from_currency = $1 AND to_currency = $2
            ",
        )
        .bind(from.code())
        .bind(to.code())
        .fetch_optional(self.pool)
        .await?;

        Ok(rate)
    }
}
