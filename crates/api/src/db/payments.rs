//! Payment transaction repositories.
//!
//! Transaction rows are append-only attempt records keyed by the provider's
//! own identifiers. Confirmation paths lock the row `FOR UPDATE` so retried
//! webhooks and double-submitted captures serialize on the transaction's
//! identity and resolve idempotently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use duka_core::{Currency, MpesaTxId, MpesaTxStatus, OrderId, PayPalTxId};

use super::RepositoryError;
use crate::models::payment::{MpesaTransaction, PayPalTransaction};

#[derive(sqlx::FromRow)]
struct MpesaTxRow {
    id: i64,
    order_id: Uuid,
    checkout_request_id: String,
    merchant_request_id: Option<String>,
    amount: Decimal,
    phone: String,
    status: String,
    result_code: Option<String>,
    result_desc: Option<String>,
    receipt: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MpesaTxRow> for MpesaTransaction {
    type Error = RepositoryError;

    fn try_from(row: MpesaTxRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid mpesa status in database: {e}"))
        })?;

        Ok(Self {
            id: MpesaTxId::new(row.id),
            order_id: OrderId::new(row.order_id),
            checkout_request_id: row.checkout_request_id,
            merchant_request_id: row.merchant_request_id,
            amount: row.amount,
            phone: row.phone,
            status,
            result_code: row.result_code,
            result_desc: row.result_desc,
            receipt: row.receipt,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PayPalTxRow {
    id: i64,
    order_id: Uuid,
    paypal_order_id: String,
    capture_id: Option<String>,
    amount: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PayPalTxRow> for PayPalTransaction {
    type Error = RepositoryError;

    fn try_from(row: PayPalTxRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid paypal status in database: {e}"))
        })?;
        let currency = row.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;

        Ok(Self {
            id: PayPalTxId::new(row.id),
            order_id: OrderId::new(row.order_id),
            paypal_order_id: row.paypal_order_id,
            capture_id: row.capture_id,
            amount: row.amount,
            currency,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for M-Pesa transaction records.
pub struct MpesaTxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MpesaTxRepository<'a> {
    /// Create a new M-Pesa transaction repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a freshly issued STK push inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the provider request id was
    /// already recorded, `RepositoryError::Database` for other failures.
    pub async fn insert(
        conn: &mut PgConnection,
        order_id: OrderId,
        checkout_request_id: &str,
        merchant_request_id: Option<&str>,
        amount: Decimal,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<MpesaTxId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO mpesa_transaction (
                order_id, checkout_request_id, merchant_request_id,
                amount, phone, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $6)
            RETURNING id
            ",
        )
        .bind(order_id)
        .bind(checkout_request_id)
        .bind(merchant_request_id)
        .bind(amount)
        .bind(phone)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(
                    "checkout request id already recorded".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

        Ok(MpesaTxId::new(id))
    }

    /// Find and lock a transaction by the provider's checkout request id,
    /// inside the caller's transaction.
    ///
    /// The webhook handler holds this lock across its read-check-write
    /// sequence so concurrent retries of the same callback serialize.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if the stored status is invalid.
    pub async fn lock_by_checkout_request_id(
        conn: &mut PgConnection,
        checkout_request_id: &str,
    ) -> Result<Option<MpesaTransaction>, RepositoryError> {
        let row = sqlx::query_as::<_, MpesaTxRow>(
            r"
            SELECT id, order_id, checkout_request_id, merchant_request_id,
                   amount, phone, status, result_code, result_desc, receipt,
                   created_at, updated_at
            FROM mpesa_transaction
            WHERE checkout_request_id = $1
            FOR UPDATE
            ",
        )
        .bind(checkout_request_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(MpesaTransaction::try_from).transpose()
    }

    /// Record the provider's callback verdict on a transaction, keeping the
    /// raw payload for audit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_result(
        conn: &mut PgConnection,
        id: MpesaTxId,
        status: MpesaTxStatus,
        result_code: &str,
        result_desc: &str,
        receipt: Option<&str>,
        raw_callback: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE mpesa_transaction
            SET status = $2,
                result_code = $3,
                result_desc = $4,
                receipt = $5,
                raw_callback = $6,
                updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(result_code)
        .bind(result_desc)
        .bind(receipt)
        .bind(raw_callback)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Repository for PayPal transaction records.
pub struct PayPalTxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PayPalTxRepository<'a> {
    /// Create a new PayPal transaction repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a transaction by the provider's order id, without locking.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if the stored status is invalid.
    pub async fn get_by_provider_order_id(
        &self,
        paypal_order_id: &str,
    ) -> Result<Option<PayPalTransaction>, RepositoryError> {
        let row = sqlx::query_as::<_, PayPalTxRow>(
            r"
            SELECT id, order_id, paypal_order_id, capture_id,
                   amount, currency, status, created_at, updated_at
            FROM paypal_transaction
            WHERE paypal_order_id = $1
            ",
        )
        .bind(paypal_order_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(PayPalTransaction::try_from).transpose()
    }

    /// Record a freshly created provider order inside the caller's
    /// transaction, keeping the raw response for audit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the provider order id was
    /// already recorded, `RepositoryError::Database` for other failures.
    pub async fn insert(
        conn: &mut PgConnection,
        order_id: OrderId,
        paypal_order_id: &str,
        amount: Decimal,
        currency: Currency,
        raw_response: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<PayPalTxId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO paypal_transaction (
                order_id, paypal_order_id, amount, currency,
                status, raw_response, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 'created', $5, $6, $6)
            RETURNING id
            ",
        )
        .bind(order_id)
        .bind(paypal_order_id)
        .bind(amount)
        .bind(currency.code())
        .bind(raw_response)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("paypal order id already recorded".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(PayPalTxId::new(id))
    }

    /// Find and lock a transaction by the provider's order id, inside the
    /// caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if the stored status is invalid.
    pub async fn lock_by_provider_order_id(
        conn: &mut PgConnection,
        paypal_order_id: &str,
    ) -> Result<Option<PayPalTransaction>, RepositoryError> {
        let row = sqlx::query_as::<_, PayPalTxRow>(
            r"
            SELECT id, order_id, paypal_order_id, capture_id,
                   amount, currency, status, created_at, updated_at
            FROM paypal_transaction
            WHERE paypal_order_id = $1
            FOR UPDATE
            ",
        )
        .bind(paypal_order_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(PayPalTransaction::try_from).transpose()
    }

    /// Record a completed capture, keeping the raw response for audit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_capture(
        conn: &mut PgConnection,
        id: PayPalTxId,
        capture_id: &str,
        raw_response: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE paypal_transaction
            SET status = 'completed',
                capture_id = $2,
                raw_response = $3,
                updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(capture_id)
        .bind(raw_response)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
