//! Postgres-backed ledger store.
//!
//! The conditional UPDATE is the CAS primitive: every guarded apply
//! re-validates the row's capacity in the WHERE clause, so a concurrent
//! writer that drained the row first simply makes this statement match zero
//! rows. Schema provisioning is external; the store assumes the
//! `inventory_rows` table exists:
//!
//! ```sql
//! CREATE TABLE inventory_rows (
//!     inventory_id      UUID PRIMARY KEY,
//!     product_id        UUID NOT NULL,
//!     warehouse_id      UUID NOT NULL,
//!     quantity          BIGINT NOT NULL,
//!     reserved_quantity BIGINT NOT NULL,
//!     updated_at        TIMESTAMPTZ NOT NULL,
//!     deleted           BOOLEAN NOT NULL DEFAULT FALSE,
//!     UNIQUE (product_id, warehouse_id)
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use stockgate_core::{InventoryId, ProductId, WarehouseId};
use stockgate_ledger::{InventoryRow, StockOperation};

use super::{LedgerStore, LedgerStoreError};

pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn row_from_pg(row: &sqlx::postgres::PgRow) -> Result<InventoryRow, LedgerStoreError> {
    let read = |e: sqlx::Error| LedgerStoreError::Query(e.to_string());
    Ok(InventoryRow {
        inventory_id: InventoryId::from_uuid(row.try_get("inventory_id").map_err(read)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(read)?),
        warehouse_id: WarehouseId::from_uuid(row.try_get("warehouse_id").map_err(read)?),
        quantity: row.try_get("quantity").map_err(read)?,
        reserved_quantity: row.try_get("reserved_quantity").map_err(read)?,
        updated_at: row.try_get("updated_at").map_err(read)?,
        deleted: row.try_get("deleted").map_err(read)?,
    })
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn rows_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryRow>, LedgerStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT inventory_id, product_id, warehouse_id, quantity, reserved_quantity, updated_at, deleted
            FROM inventory_rows
            WHERE product_id = $1 AND NOT deleted
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| LedgerStoreError::Query(e.to_string()))?;

        rows.iter().map(row_from_pg).collect()
    }

    async fn get_row(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<InventoryRow>, LedgerStoreError> {
        let row = sqlx::query(
            r#"
            SELECT inventory_id, product_id, warehouse_id, quantity, reserved_quantity, updated_at, deleted
            FROM inventory_rows
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| LedgerStoreError::Query(e.to_string()))?;

        row.as_ref().map(row_from_pg).transpose()
    }

    async fn upsert_row(&self, row: InventoryRow) -> Result<(), LedgerStoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_rows (
                inventory_id, product_id, warehouse_id, quantity, reserved_quantity, updated_at, deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET
                quantity = EXCLUDED.quantity,
                reserved_quantity = EXCLUDED.reserved_quantity,
                updated_at = EXCLUDED.updated_at,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(row.inventory_id.as_uuid())
        .bind(row.product_id.as_uuid())
        .bind(row.warehouse_id.as_uuid())
        .bind(row.quantity)
        .bind(row.reserved_quantity)
        .bind(row.updated_at)
        .bind(row.deleted)
        .execute(&*self.pool)
        .await
        .map_err(|e| LedgerStoreError::Write(e.to_string()))?;

        Ok(())
    }

    async fn try_apply(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        operation: StockOperation,
        take: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerStoreError> {
        // Guard and mutation in one statement per operation kind.
        let sql = match operation {
            StockOperation::Reduce => {
                r#"
                UPDATE inventory_rows
                SET quantity = quantity - $3, updated_at = $4
                WHERE product_id = $1 AND warehouse_id = $2
                  AND NOT deleted
                  AND quantity - reserved_quantity >= $3
                "#
            }
            StockOperation::Reserve => {
                r#"
                UPDATE inventory_rows
                SET reserved_quantity = reserved_quantity + $3, updated_at = $4
                WHERE product_id = $1 AND warehouse_id = $2
                  AND NOT deleted
                  AND quantity - reserved_quantity >= $3
                "#
            }
            StockOperation::Release => {
                r#"
                UPDATE inventory_rows
                SET reserved_quantity = reserved_quantity - $3, updated_at = $4
                WHERE product_id = $1 AND warehouse_id = $2
                  AND NOT deleted
                  AND reserved_quantity >= $3
                "#
            }
        };

        let result = sqlx::query(sql)
            .bind(product_id.as_uuid())
            .bind(warehouse_id.as_uuid())
            .bind(take)
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| LedgerStoreError::Write(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn repair_row(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_rows
            SET reserved_quantity = quantity, updated_at = $3
            WHERE product_id = $1 AND warehouse_id = $2
              AND reserved_quantity > quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| LedgerStoreError::Write(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
