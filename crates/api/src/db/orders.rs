//! Order repository.
//!
//! Orders are written once at checkout (inside the checkout transaction)
//! and thereafter mutated only by the payment adapters and administrative
//! transitions. They are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use duka_core::{
    OrderId, OrderItemId, ProductId, SessionToken, StationId, UserId, VariantId,
};

use super::RepositoryError;
use crate::middleware::Identity;
use crate::models::order::{Order, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Option<i64>,
    session_token: Option<String>,
    status: String,
    payment_status: String,
    payment_method: String,
    currency: String,
    full_name: String,
    email: String,
    phone: String,
    delivery_type: String,
    pickup_station_id: Option<i64>,
    shipping_address: String,
    shipping_city: String,
    shipping_postal_code: String,
    subtotal: Decimal,
    shipping_fee: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    mpesa_checkout_request_id: Option<String>,
    mpesa_receipt: Option<String>,
    mpesa_phone: Option<String>,
    paypal_order_id: Option<String>,
    paypal_capture_id: Option<String>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        fn parse<T: std::str::FromStr<Err = String>>(
            value: &str,
            what: &str,
        ) -> Result<T, RepositoryError> {
            value.parse().map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid {what} in database: {e}"))
            })
        }

        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            user_id: row.user_id.map(UserId::new),
            session_token: row.session_token.map(SessionToken::new),
            status: parse(&row.status, "order status")?,
            payment_status: parse(&row.payment_status, "payment status")?,
            payment_method: parse(&row.payment_method, "payment method")?,
            currency: parse(&row.currency, "currency")?,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            delivery_type: parse(&row.delivery_type, "delivery type")?,
            pickup_station_id: row.pickup_station_id.map(StationId::new),
            shipping_address: row.shipping_address,
            shipping_city: row.shipping_city,
            shipping_postal_code: row.shipping_postal_code,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
            mpesa_checkout_request_id: row.mpesa_checkout_request_id,
            mpesa_receipt: row.mpesa_receipt,
            mpesa_phone: row.mpesa_phone,
            paypal_order_id: row.paypal_order_id,
            paypal_capture_id: row.paypal_capture_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: Uuid,
    product_id: Option<Uuid>,
    variant_id: Option<i64>,
    product_name: String,
    variant_name: Option<String>,
    sku: String,
    unit_price: Decimal,
    quantity: i32,
    currency: String,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let currency = row.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            variant_id: row.variant_id.map(VariantId::new),
            product_name: row.product_name,
            variant_name: row.variant_name,
            sku: row.sku,
            unit_price: row.unit_price,
            quantity: row.quantity,
            currency,
        })
    }
}

const ORDER_COLUMNS: &str = r"
    id, order_number, user_id, session_token,
    status, payment_status, payment_method, currency,
    full_name, email, phone,
    delivery_type, pickup_station_id,
    shipping_address, shipping_city, shipping_postal_code,
    subtotal, shipping_fee, tax, discount, total,
    mpesa_checkout_request_id, mpesa_receipt, mpesa_phone,
    paypal_order_id, paypal_capture_id,
    notes, created_at, updated_at";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if any stored status is invalid.
    pub async fn list_for(&self, identity: &Identity) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM customer_order
            WHERE ($1::BIGINT IS NOT NULL AND user_id = $1)
               OR ($2::TEXT IS NOT NULL AND session_token = $2)
            ORDER BY created_at DESC
            "
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(identity.user_param())
            .bind(identity.session_param())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Get one of the caller's orders by id.
    ///
    /// Orders belonging to another identity come back as `None`, the same
    /// as a missing order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if any stored status is invalid.
    pub async fn get_owned(
        &self,
        id: OrderId,
        identity: &Identity,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM customer_order
            WHERE id = $1
              AND (($2::BIGINT IS NOT NULL AND user_id = $2)
                OR ($3::TEXT IS NOT NULL AND session_token = $3))
            "
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(identity.user_param())
            .bind(identity.session_param())
            .fetch_optional(self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Load the items frozen onto an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails,
    /// `RepositoryError::DataCorruption` if any stored currency is invalid.
    pub async fn items_for(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, variant_id,
                   product_name, variant_name, sku,
                   unit_price, quantity, currency
            FROM order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// Insert a freshly built order inside the caller's transaction
    /// (checkout step).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on an order number collision,
    /// `RepositoryError::Database` for other failures.
    pub async fn insert(conn: &mut PgConnection, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customer_order (
                id, order_number, user_id, session_token,
                status, payment_status, payment_method, currency,
                full_name, email, phone,
                delivery_type, pickup_station_id,
                shipping_address, shipping_city, shipping_postal_code,
                subtotal, shipping_fee, tax, discount, total,
                notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            ",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id.map(|id| id.as_i64()))
        .bind(order.session_token.as_ref().map(SessionToken::as_str))
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.currency.code())
        .bind(&order.full_name)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(order.delivery_type.as_str())
        .bind(order.pickup_station_id.map(|id| id.as_i64()))
        .bind(&order.shipping_address)
        .bind(&order.shipping_city)
        .bind(&order.shipping_postal_code)
        .bind(order.subtotal)
        .bind(order.shipping_fee)
        .bind(order.tax)
        .bind(order.discount)
        .bind(order.total)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("order number already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Insert one frozen order item inside the caller's transaction
    /// (checkout step), returning the assigned id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_item(
        conn: &mut PgConnection,
        item: &OrderItem,
    ) -> Result<OrderItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO order_item (
                order_id, product_id, variant_id,
                product_name, variant_name, sku,
                unit_price, quantity, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(item.order_id)
        .bind(item.product_id.map(|id| id.as_uuid()))
        .bind(item.variant_id.map(|id| id.as_i64()))
        .bind(&item.product_name)
        .bind(&item.variant_name)
        .bind(&item.sku)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.currency.code())
        .fetch_one(&mut *conn)
        .await?;

        Ok(OrderItemId::new(id))
    }

    /// Stamp the M-Pesa references on an order and move it to
    /// `payment_pending` after a successful STK push.
    ///
    /// Applies only while the order is still payable (`pending` or an
    /// earlier retry's `payment_pending`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is not in a
    /// payable state, `RepositoryError::Database` for other failures.
    pub async fn record_mpesa_initiated(
        conn: &mut PgConnection,
        id: OrderId,
        checkout_request_id: &str,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customer_order
            SET mpesa_checkout_request_id = $2,
                mpesa_phone = $3,
                status = 'payment_pending',
                updated_at = $4
            WHERE id = $1 AND status IN ('pending', 'payment_pending')
            ",
        )
        .bind(id)
        .bind(checkout_request_id)
        .bind(phone)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Stamp the PayPal order id on an order and move it to
    /// `payment_pending` after the provider order is created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is not in a
    /// payable state, `RepositoryError::Database` for other failures.
    pub async fn record_paypal_created(
        conn: &mut PgConnection,
        id: OrderId,
        paypal_order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customer_order
            SET paypal_order_id = $2,
                status = 'payment_pending',
                updated_at = $3
            WHERE id = $1 AND status IN ('pending', 'payment_pending')
            ",
        )
        .bind(id)
        .bind(paypal_order_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Mark an order paid and confirmed from an M-Pesa confirmation.
    ///
    /// Guarded on `payment_status = 'pending'`: re-delivered webhooks find
    /// zero rows to update and the call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid_mpesa(
        conn: &mut PgConnection,
        id: OrderId,
        receipt: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE customer_order
            SET payment_status = 'paid',
                status = 'confirmed',
                mpesa_receipt = $2,
                updated_at = $3
            WHERE id = $1 AND payment_status = 'pending'
            ",
        )
        .bind(id)
        .bind(receipt)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Mark an order paid and confirmed from a PayPal capture.
    ///
    /// Guarded on `payment_status = 'pending'` for the same idempotency
    /// reason as [`Self::mark_paid_mpesa`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid_paypal(
        conn: &mut PgConnection,
        id: OrderId,
        capture_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE customer_order
            SET payment_status = 'paid',
                status = 'confirmed',
                paypal_capture_id = $2,
                updated_at = $3
            WHERE id = $1 AND payment_status = 'pending'
            ",
        )
        .bind(id)
        .bind(capture_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
