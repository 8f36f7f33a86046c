//! Pickup station repository (read-only).

use sqlx::PgPool;

use duka_core::StationId;

use super::RepositoryError;
use crate::models::station::PickupStation;

/// Read-only access to pickup stations.
pub struct StationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StationRepository<'a> {
    /// Create a new station repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an active pickup station by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(
        &self,
        id: StationId,
    ) -> Result<Option<PickupStation>, RepositoryError> {
        let station = sqlx::query_as::<_, PickupStation>(
            r"
            SELECT id, name, address, phone, operating_hours,
                   delivery_fee_usd, delivery_fee_kes, is_active
            FROM pickup_station
            WHERE id = $1 AND is_active = TRUE
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(station)
    }
}
