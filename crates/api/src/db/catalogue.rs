//! Catalogue repository (read-only).
//!
//! The catalogue service owns these tables; the storefront only resolves
//! references and reads current prices when validating cart mutations.

use sqlx::PgPool;

use duka_core::{ProductId, VariantId};

use super::RepositoryError;
use crate::models::catalogue::{Product, ProductVariant};

/// Read-only access to catalogue products and variants.
pub struct CatalogueRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogueRepository<'a> {
    /// Create a new catalogue repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve an active product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, slug, sku,
                   price_usd, sale_price_usd, price_kes, sale_price_kes,
                   is_active, created_at
            FROM product
            WHERE id = $1 AND is_active = TRUE
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Resolve an active variant by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_variant(
        &self,
        id: VariantId,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let variant = sqlx::query_as::<_, ProductVariant>(
            r"
            SELECT id, product_id, name, sku,
                   price_usd, sale_price_usd, price_kes, sale_price_kes,
                   stock, is_active
            FROM product_variant
            WHERE id = $1 AND is_active = TRUE
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(variant)
    }
}
