//! Coupon repository.
//!
//! `used_count` is the one piece of shared mutable state in this core.
//! Redemption always happens inside the checkout transaction with the row
//! locked `FOR UPDATE` across the eligibility re-check and the increment, so
//! two concurrent checkouts cannot both pass a `used_count < max_uses` check
//! and over-redeem the code.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use duka_core::{CouponId, DiscountType};

use super::RepositoryError;
use crate::models::coupon::Coupon;

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: i64,
    code: String,
    description: String,
    discount_type: String,
    discount_value: Decimal,
    min_order_value: Decimal,
    max_uses: Option<i32>,
    used_count: i32,
    is_active: bool,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let discount_type: DiscountType = row.discount_type.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid discount type in database: {e}"))
        })?;

        Ok(Self {
            id: CouponId::new(row.id),
            code: row.code,
            description: row.description,
            discount_type,
            discount_value: row.discount_value,
            min_order_value: row.min_order_value,
            max_uses: row.max_uses,
            used_count: row.used_count,
            is_active: row.is_active,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
        })
    }
}

const SELECT_COLUMNS: &str = r"
    SELECT id, code, description, discount_type, discount_value,
           min_order_value, max_uses, used_count, is_active,
           valid_from, valid_until
    FROM coupon
    WHERE code = $1 AND is_active = TRUE";

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active coupon by code, without locking (preview path).
    ///
    /// Inactive coupons are treated as not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if the stored discount type is
    /// invalid.
    pub async fn find_active(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(SELECT_COLUMNS)
            .bind(code)
            .fetch_optional(self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Find and lock an active coupon inside the caller's transaction
    /// (redemption path).
    ///
    /// The row lock is held until the transaction commits, covering both
    /// the eligibility check and the usage increment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if the stored discount type is
    /// invalid.
    pub async fn lock_active(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS}\n    FOR UPDATE");

        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Increment the coupon's usage counter by exactly one.
    ///
    /// Must only be called with the row locked via [`Self::lock_active`]
    /// in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon vanished,
    /// `RepositoryError::Database` for other failures.
    pub async fn increment_usage(
        conn: &mut PgConnection,
        id: CouponId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE coupon SET used_count = used_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
