//! In-memory ledger store for dev/test.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockgate_core::{ProductId, WarehouseId};
use stockgate_ledger::{InventoryRow, StockOperation};

use super::{LedgerStore, LedgerStoreError};

/// RwLock'd map keyed by (product, warehouse). The write lock makes each
/// `try_apply` guard-check-then-write atomic, which is the same contract the
/// Postgres store gets from its conditional UPDATE.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    rows: RwLock<HashMap<(ProductId, WarehouseId), InventoryRow>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn rows_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryRow>, LedgerStoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| LedgerStoreError::Query("ledger lock poisoned".to_string()))?;
        Ok(rows
            .values()
            .filter(|r| r.product_id == product_id && !r.deleted)
            .cloned()
            .collect())
    }

    async fn get_row(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<InventoryRow>, LedgerStoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| LedgerStoreError::Query("ledger lock poisoned".to_string()))?;
        Ok(rows.get(&(product_id, warehouse_id)).cloned())
    }

    async fn upsert_row(&self, row: InventoryRow) -> Result<(), LedgerStoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerStoreError::Write("ledger lock poisoned".to_string()))?;
        rows.insert((row.product_id, row.warehouse_id), row);
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
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerStoreError::Write("ledger lock poisoned".to_string()))?;

        let Some(row) = rows.get_mut(&(product_id, warehouse_id)) else {
            return Ok(false);
        };
        if row.deleted || !operation.guard_ok(row, take) {
            return Ok(false);
        }

        operation.apply_to(row, take, now);
        Ok(true)
    }

    async fn repair_row(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerStoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerStoreError::Write("ledger lock poisoned".to_string()))?;

        match rows.get_mut(&(product_id, warehouse_id)) {
            Some(row) => Ok(row.repair(now)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_row(quantity: i64, reserved: i64) -> (InMemoryLedgerStore, ProductId, WarehouseId) {
        let store = InMemoryLedgerStore::new();
        let product = ProductId::new();
        let warehouse = WarehouseId::new();
        let mut row = InventoryRow::new(product, warehouse, quantity, Utc::now()).unwrap();
        row.reserved_quantity = reserved;
        futures_block_on(store.upsert_row(row)).unwrap();
        (store, product, warehouse)
    }

    // Tiny current-thread executor so the store tests stay synchronous.
    fn futures_block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn try_apply_respects_the_guard() {
        let (store, product, warehouse) = store_with_row(5, 0);
        let now = Utc::now();

        assert!(futures_block_on(store.try_apply(product, warehouse, StockOperation::Reduce, 5, now)).unwrap());
        assert!(!futures_block_on(store.try_apply(product, warehouse, StockOperation::Reduce, 1, now)).unwrap());
    }

    #[test]
    fn try_apply_skips_tombstoned_rows() {
        let (store, product, warehouse) = store_with_row(5, 0);
        let now = Utc::now();

        let mut row = futures_block_on(store.get_row(product, warehouse)).unwrap().unwrap();
        row.deleted = true;
        futures_block_on(store.upsert_row(row)).unwrap();

        assert!(!futures_block_on(store.try_apply(product, warehouse, StockOperation::Reduce, 1, now)).unwrap());
    }

    #[test]
    fn repair_row_clamps_drifted_reserved() {
        let (store, product, warehouse) = store_with_row(10, 12);
        let now = Utc::now();

        assert!(futures_block_on(store.repair_row(product, warehouse, now)).unwrap());
        let row = futures_block_on(store.get_row(product, warehouse)).unwrap().unwrap();
        assert_eq!(row.reserved_quantity, 10);

        assert!(!futures_block_on(store.repair_row(product, warehouse, now)).unwrap());
    }
}
