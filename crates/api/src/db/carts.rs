//! Cart repository.
//!
//! Carts are keyed by caller identity: one per user id, one per anonymous
//! session token, enforced by unique indexes. Lines are merged per
//! (product, variant) pair by an upsert against a `NULLS NOT DISTINCT`
//! unique index, so adding the same selection twice increments the quantity
//! instead of duplicating the row.
//!
//! Unit prices are never stored on cart rows; the loading queries join the
//! catalogue and resolve the effective price fallback chain per currency at
//! read time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use duka_core::{CartId, CartItemId, ProductId, SessionToken, UserId, VariantId};

use super::RepositoryError;
use crate::middleware::Identity;
use crate::models::cart::{Cart, CartLine};

/// Effective-price projection shared by the cart queries.
///
/// Variant sale price, then variant price, then product sale price, then
/// product price. A variant-less line sees only the product columns.
const EFFECTIVE_PRICE_COLUMNS: &str = r"
       COALESCE(v.sale_price_usd, v.price_usd, p.sale_price_usd, p.price_usd) AS unit_price_usd,
       COALESCE(v.sale_price_kes, v.price_kes, p.sale_price_kes, p.price_kes) AS unit_price_kes";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i64,
    user_id: Option<i64>,
    session_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            session_token: row.session_token.map(SessionToken::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
    product_name: String,
    variant_name: Option<String>,
    sku: String,
    unit_price_usd: Decimal,
    unit_price_kes: Decimal,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            product_name: row.product_name,
            variant_name: row.variant_name,
            sku: row.sku,
            unit_price_usd: row.unit_price_usd,
            unit_price_kes: row.unit_price_kes,
        }
    }
}

/// A cart line as seen by checkout, before the resolvability policy is
/// applied.
///
/// The catalogue side of the join is outer: a line whose product has
/// vanished between add-to-cart and checkout comes back with `NULL`
/// catalogue columns, and checkout rejects the whole request rather than
/// silently dropping or mispricing the line.
#[derive(Debug, sqlx::FromRow)]
pub struct CheckoutLineRow {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub product_name: Option<String>,
    pub variant_name: Option<String>,
    pub sku: Option<String>,
    pub unit_price_usd: Option<Decimal>,
    pub unit_price_kes: Option<Decimal>,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the caller's cart, creating it if this identity has none yet.
    ///
    /// Uniqueness per identity is enforced by the database; concurrent
    /// first requests race on the unique index and both land on the same
    /// row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Cart, RepositoryError> {
        let row = match identity {
            Identity::User(user_id) => {
                sqlx::query_as::<_, CartRow>(
                    r"
                    INSERT INTO cart (user_id, created_at, updated_at)
                    VALUES ($1, $2, $2)
                    ON CONFLICT (user_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
                    RETURNING id, user_id, session_token, created_at, updated_at
                    ",
                )
                .bind(user_id.as_i64())
                .bind(now)
                .fetch_one(self.pool)
                .await?
            }
            Identity::Session(token) => {
                sqlx::query_as::<_, CartRow>(
                    r"
                    INSERT INTO cart (session_token, created_at, updated_at)
                    VALUES ($1, $2, $2)
                    ON CONFLICT (session_token) DO UPDATE SET updated_at = EXCLUDED.updated_at
                    RETURNING id, user_id, session_token, created_at, updated_at
                    ",
                )
                .bind(token.as_str())
                .bind(now)
                .fetch_one(self.pool)
                .await?
            }
        };

        Ok(row.into())
    }

    /// Find a cart by its anonymous session token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, session_token, created_at, updated_at
            FROM cart
            WHERE session_token = $1
            ",
        )
        .bind(token.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Load the cart's lines with unit prices resolved live from the
    /// catalogue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn priced_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!(
            r"
            SELECT ci.id, ci.product_id, ci.variant_id, ci.quantity,
                   p.name AS product_name,
                   v.name AS variant_name,
                   COALESCE(v.sku, p.sku) AS sku,{EFFECTIVE_PRICE_COLUMNS}
            FROM cart_item ci
            JOIN product p ON p.id = ci.product_id
            LEFT JOIN product_variant v ON v.id = ci.variant_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at, ci.id
            "
        );

        let rows = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a line to the cart, merging with an existing (product, variant)
    /// line by incrementing its quantity.
    ///
    /// Catalogue references must already be validated by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<CartItemId, RepositoryError> {
        let item_id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO cart_item (cart_id, product_id, variant_id, quantity, added_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cart_id, product_id, variant_id)
            DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        self.touch(cart_id, now).await?;

        Ok(CartItemId::new(item_id))
    }

    /// Set a line's quantity; a quantity of zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not belong to
    /// the cart, `RepositoryError::Database` for other failures.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = if quantity <= 0 {
            sqlx::query("DELETE FROM cart_item WHERE id = $1 AND cart_id = $2")
                .bind(item_id)
                .bind(cart_id)
                .execute(self.pool)
                .await?
        } else {
            sqlx::query("UPDATE cart_item SET quantity = $3 WHERE id = $1 AND cart_id = $2")
                .bind(item_id)
                .bind(cart_id)
                .bind(quantity)
                .execute(self.pool)
                .await?
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.touch(cart_id, now).await?;

        Ok(())
    }

    /// Remove a line from the cart.
    ///
    /// # Returns
    ///
    /// Returns `true` if the line was removed, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_item WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(self.pool)
            .await?;

        self.touch(cart_id, now).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;

        self.touch(cart_id, now).await?;

        Ok(())
    }

    /// Fold the source cart into the destination cart and delete the source.
    ///
    /// Used when an anonymous cart is merged into a signed-in user's cart
    /// after authentication. Runs in one transaction with both cart rows
    /// locked (in id order) so concurrent mutations of either cart
    /// serialize behind the merge: matching (product, variant) lines have
    /// their quantities summed, the rest move over, nothing is dropped or
    /// double counted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn merge(
        &self,
        source: CartId,
        dest: CartId,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM cart WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(vec![source.as_i64(), dest.as_i64()])
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO cart_item (cart_id, product_id, variant_id, quantity, added_at)
            SELECT $2, product_id, variant_id, quantity, added_at
            FROM cart_item
            WHERE cart_id = $1
            ON CONFLICT (cart_id, product_id, variant_id)
            DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity
            ",
        )
        .bind(source)
        .bind(dest)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_item WHERE cart_id = $1")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM cart WHERE id = $1")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE cart SET updated_at = $2 WHERE id = $1")
            .bind(dest)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Load and lock the cart's lines for checkout, inside the caller's
    /// transaction.
    ///
    /// Locks the cart item rows (`FOR UPDATE OF ci`) so concurrent cart
    /// mutations serialize behind the checkout, and left-joins the
    /// catalogue so vanished products surface as `NULL` columns for the
    /// checkout policy to reject.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_checkout(
        conn: &mut PgConnection,
        cart_id: CartId,
    ) -> Result<Vec<CheckoutLineRow>, RepositoryError> {
        let sql = format!(
            r"
            SELECT ci.id, ci.product_id, ci.variant_id, ci.quantity,
                   p.name AS product_name,
                   v.name AS variant_name,
                   COALESCE(v.sku, p.sku) AS sku,{EFFECTIVE_PRICE_COLUMNS}
            FROM cart_item ci
            LEFT JOIN product p ON p.id = ci.product_id
            LEFT JOIN product_variant v ON v.id = ci.variant_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at, ci.id
            FOR UPDATE OF ci
            "
        );

        let rows = sqlx::query_as::<_, CheckoutLineRow>(&sql)
            .bind(cart_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows)
    }

    /// Empty the cart inside the caller's transaction (checkout step).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_in_tx(
        conn: &mut PgConnection,
        cart_id: CartId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Bump the cart's `updated_at`.
    async fn touch(&self, cart_id: CartId, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE cart SET updated_at = $2 WHERE id = $1")
            .bind(cart_id)
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
