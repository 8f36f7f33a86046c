//! Database operations for the storefront `PostgreSQL`.
//!
//! # Database: `duka_api`
//!
//! ## Tables
//!
//! - `product`, `product_variant` - Catalogue (owned by the catalogue
//!   service; read here to price carts and freeze order items)
//! - `pickup_station` - Pickup locations with per-currency delivery fees
//! - `exchange_rate` - Currency pair multipliers, refreshed externally
//! - `cart`, `cart_item` - Pre-purchase selections per caller identity
//! - `coupon` - Discount codes with usage accounting
//! - `customer_order`, `order_item` - Immutable checkout snapshots
//! - `mpesa_transaction`, `paypal_transaction` - Payment attempt records
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p duka-cli -- migrate api
//! ```
//!
//! # Conventions
//!
//! Repositories borrow a [`PgPool`] for single-statement operations.
//! Multi-statement sequences that must be atomic (checkout, cart merge,
//! payment confirmation) run against a caller-owned transaction; the
//! repository exposes those steps as associated functions taking
//! `&mut PgConnection`.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod carts;
pub mod catalogue;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod rates;
pub mod stations;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart per identity).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
