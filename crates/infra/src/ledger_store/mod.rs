//! Warehouse ledger storage abstractions.
//!
//! The store is pure row storage: reads, full-row upserts, and the two
//! conditional writes the allocator needs (guarded apply, reserved-column
//! repair). No allocation policy lives here.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockgate_core::{ProductId, WarehouseId};
use stockgate_ledger::{InventoryRow, StockOperation};

#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("ledger query failed: {0}")]
    Query(String),

    #[error("ledger write failed: {0}")]
    Write(String),
}

/// Durable table of `(product, warehouse) -> InventoryRow`.
///
/// Implementations must make `try_apply` atomic per row: the guard is
/// re-validated at write time (compare-and-swap), which is what defends the
/// ledger path against concurrent allocators racing on the same row.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// All non-deleted rows for a product. Order is unspecified; the
    /// allocator ranks them itself.
    async fn rows_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryRow>, LedgerStoreError>;

    /// One row, tombstoned or not (stock-set needs to revive tombstones).
    async fn get_row(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<InventoryRow>, LedgerStoreError>;

    /// Create or fully replace a row (stock set/update, tombstone, revive).
    async fn upsert_row(&self, row: InventoryRow) -> Result<(), LedgerStoreError>;

    /// Guarded single-row apply. Returns `false` when the guard failed (a
    /// concurrent writer drained the row's capacity first) or the row is
    /// missing/tombstoned; the caller then moves on to the next ranked row.
    async fn try_apply(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        operation: StockOperation,
        take: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerStoreError>;

    /// Clamp `reserved_quantity` to `quantity` if it has drifted above it.
    /// Returns `true` when a repair was persisted.
    async fn repair_row(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerStoreError>;
}
