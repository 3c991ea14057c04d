//! Postgres-backed reservation store.
//!
//! One JSONB snapshot per product. Assumes the `soft_reservations` table
//! exists (schema provisioning is external):
//!
//! ```sql
//! CREATE TABLE soft_reservations (
//!     product_id UUID PRIMARY KEY,
//!     entries    JSONB NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use stockgate_core::ProductId;
use stockgate_reservations::{ReservationSet, SoftReservation};

use super::{ReservationStore, ReservationStoreError};

pub struct PostgresReservationStore {
    pool: Arc<PgPool>,
}

impl PostgresReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn load(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ReservationSet>, ReservationStoreError> {
        let row = sqlx::query(
            r#"
            SELECT entries, updated_at
            FROM soft_reservations
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReservationStoreError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let entries: serde_json::Value = row
            .try_get("entries")
            .map_err(|e| ReservationStoreError::Query(e.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| ReservationStoreError::Query(e.to_string()))?;

        let entries: Vec<SoftReservation> = serde_json::from_value(entries)
            .map_err(|e| ReservationStoreError::Decode(e.to_string()))?;

        Ok(Some(ReservationSet::from_entries(entries, updated_at)))
    }

    async fn save(
        &self,
        product_id: ProductId,
        set: &ReservationSet,
    ) -> Result<(), ReservationStoreError> {
        let entries = serde_json::to_value(set.entries())
            .map_err(|e| ReservationStoreError::Decode(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO soft_reservations (product_id, entries, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id)
            DO UPDATE SET entries = EXCLUDED.entries, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(entries)
        .bind(set.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| ReservationStoreError::Write(e.to_string()))?;

        Ok(())
    }
}
