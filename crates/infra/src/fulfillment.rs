//! Fulfillment facade: the single entry point collaborators call.
//!
//! Translates product-level operations into ledger + allocator calls or
//! reservation-actor calls, and owns the cache-invalidation side effect.
//! Downstream shipping/cart logic trusts the `available_stock` number this
//! facade presents.
//!
//! Soft holds are advisory and do not change available stock; the ledger's
//! `reserved_quantity` column is the source of truth for availability. The
//! one reconciliation point between the two mechanisms is [`commit_hold`],
//! which drops the hold and then deducts the ledger by the dropped amount.
//!
//! [`commit_hold`]: FulfillmentService::commit_hold

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use stockgate_core::{DomainError, OrderId, ProductId, WarehouseId};
use stockgate_ledger::{AggregateStock, InventoryRow, StockOperation};
use stockgate_reservations::{
    AllView, CleanupOutcome, ReleaseOutcome, ReserveOutcome, SelectionKey, StatusView,
};

use crate::actor::ReservationService;
use crate::allocator::{AllocationOutcome, allocate};
use crate::cache::ShippingCache;
use crate::error::EngineError;
use crate::ledger_store::LedgerStore;
use crate::reservation_store::ReservationStore;

/// Per-warehouse availability view consumed by shipping-option pricing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WarehouseStock {
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub available: i64,
}

/// Outcome of committing a hold: the hold side plus the ledger side.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommitOutcome {
    pub committed: i64,
    pub total_reserved: i64,
    pub allocation: Option<AllocationOutcome>,
}

pub struct FulfillmentService<L, R, C>
where
    L: LedgerStore,
    R: ReservationStore,
    C: ShippingCache,
{
    ledger: Arc<L>,
    reservations: ReservationService<R>,
    cache: Arc<C>,
}

impl<L, R, C> FulfillmentService<L, R, C>
where
    L: LedgerStore,
    R: ReservationStore,
    C: ShippingCache,
{
    pub fn new(ledger: Arc<L>, reservation_store: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            ledger,
            reservations: ReservationService::new(reservation_store),
            cache,
        }
    }

    // ---- product-level stock queries ----

    /// Aggregate available stock. A product with no ledger rows reports 0,
    /// not an error.
    pub async fn available_stock(&self, product_id: ProductId) -> Result<i64, EngineError> {
        Ok(self.aggregate_stock(product_id).await?.available)
    }

    pub async fn aggregate_stock(
        &self,
        product_id: ProductId,
    ) -> Result<AggregateStock, EngineError> {
        let rows = self.ledger.rows_for_product(product_id).await?;
        Ok(AggregateStock::from_rows(rows.iter()))
    }

    /// Batch lookup for cart validation.
    pub async fn available_stock_batch(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, i64)>, EngineError> {
        let mut out = Vec::with_capacity(product_ids.len());
        for &product_id in product_ids {
            out.push((product_id, self.available_stock(product_id).await?));
        }
        Ok(out)
    }

    /// The per-warehouse availability view the shipping module consumes.
    pub async fn per_warehouse_stock(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WarehouseStock>, EngineError> {
        let mut rows = self.ledger.rows_for_product(product_id).await?;
        rows.sort_by_key(|r| r.warehouse_id);
        Ok(rows
            .into_iter()
            .map(|r| WarehouseStock {
                warehouse_id: r.warehouse_id,
                quantity: r.quantity,
                reserved_quantity: r.reserved_quantity,
                available: r.available(),
            })
            .collect())
    }

    // ---- stock mutations (ledger path) ----

    /// Create or replace the physical quantity for one warehouse.
    /// Re-activates a tombstoned row under its original identity.
    ///
    /// The warehouse may be omitted for single-warehouse products: the sole
    /// existing row is targeted, or a fresh warehouse is minted for a
    /// product with no rows yet. Multi-warehouse products must name one.
    pub async fn set_stock(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        quantity: i64,
    ) -> Result<InventoryRow, EngineError> {
        let warehouse_id = match warehouse_id {
            Some(warehouse_id) => warehouse_id,
            None => {
                let rows = self.ledger.rows_for_product(product_id).await?;
                match rows.as_slice() {
                    [] => WarehouseId::new(),
                    [only] => only.warehouse_id,
                    _ => {
                        return Err(DomainError::validation(
                            "warehouse_id is required for a multi-warehouse product",
                        )
                        .into());
                    }
                }
            }
        };

        let now = Utc::now();
        let row = match self.ledger.get_row(product_id, warehouse_id).await? {
            Some(mut existing) => {
                existing.set_quantity(quantity, now)?;
                existing.deleted = false;
                existing
            }
            None => InventoryRow::new(product_id, warehouse_id, quantity, now)?,
        };

        self.ledger.upsert_row(row.clone()).await?;
        self.cache.invalidate_product(product_id);
        info!(product = %product_id, warehouse = %warehouse_id, quantity, "stock set");
        Ok(row)
    }

    /// Tombstone a row: excluded from every aggregate read from now on.
    pub async fn remove_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        let Some(mut row) = self.ledger.get_row(product_id, warehouse_id).await? else {
            return Err(DomainError::not_found().into());
        };
        row.deleted = true;
        row.updated_at = now;
        self.ledger.upsert_row(row).await?;
        self.cache.invalidate_product(product_id);
        Ok(())
    }

    /// Permanently deduct physical stock (the commit path).
    pub async fn reduce_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        preferred: Option<WarehouseId>,
    ) -> Result<AllocationOutcome, EngineError> {
        let outcome = allocate(
            &*self.ledger,
            product_id,
            quantity,
            StockOperation::Reduce,
            preferred,
            Utc::now(),
        )
        .await;
        self.invalidate_after(product_id, &outcome);
        outcome
    }

    /// Legacy hard reservation against the ledger's reserved column.
    /// Changes available stock immediately, unlike a soft hold.
    pub async fn reserve_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        preferred: Option<WarehouseId>,
    ) -> Result<AllocationOutcome, EngineError> {
        let outcome = allocate(
            &*self.ledger,
            product_id,
            quantity,
            StockOperation::Reserve,
            preferred,
            Utc::now(),
        )
        .await;
        self.invalidate_after(product_id, &outcome);
        outcome
    }

    /// Legacy release of hard-reserved units.
    pub async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        preferred: Option<WarehouseId>,
    ) -> Result<AllocationOutcome, EngineError> {
        let outcome = allocate(
            &*self.ledger,
            product_id,
            quantity,
            StockOperation::Release,
            preferred,
            Utc::now(),
        )
        .await;
        self.invalidate_after(product_id, &outcome);
        outcome
    }

    // ---- soft holds (actor path) ----

    /// Place or refresh a time-bounded hold. Advisory: does not change
    /// available stock.
    pub async fn hold(
        &self,
        product_id: ProductId,
        order_id: OrderId,
        quantity: i64,
        ttl_minutes: Option<i64>,
    ) -> Result<ReserveOutcome, EngineError> {
        self.reservations
            .reserve(product_id, order_id, quantity, ttl_minutes)
            .await
    }

    pub async fn release_hold(
        &self,
        product_id: ProductId,
        key: SelectionKey,
    ) -> Result<ReleaseOutcome, EngineError> {
        self.reservations.release(product_id, key).await
    }

    /// Realize hold(s) as a permanent ledger deduction: drop the hold, then
    /// deduct the ledger by the dropped amount.
    ///
    /// An unknown order id commits nothing and succeeds (idempotent, safe to
    /// retry). If the ledger deduction fails after the hold was dropped, the
    /// conflict propagates and the hold is not resurrected: holds are
    /// advisory and never guaranteed ledger stock in the first place.
    pub async fn commit_hold(
        &self,
        product_id: ProductId,
        key: SelectionKey,
        preferred: Option<WarehouseId>,
    ) -> Result<CommitOutcome, EngineError> {
        let reduced = self.reservations.reduce(product_id, key).await?;
        if reduced.reduced == 0 {
            return Ok(CommitOutcome {
                committed: 0,
                total_reserved: reduced.total_reserved,
                allocation: None,
            });
        }

        let allocation = allocate(
            &*self.ledger,
            product_id,
            reduced.reduced,
            StockOperation::Reduce,
            preferred,
            Utc::now(),
        )
        .await;
        self.invalidate_after(product_id, &allocation);
        let allocation = allocation?;

        info!(
            product = %product_id,
            committed = reduced.reduced,
            "hold committed to ledger"
        );
        Ok(CommitOutcome {
            committed: reduced.reduced,
            total_reserved: reduced.total_reserved,
            allocation: Some(allocation),
        })
    }

    pub async fn hold_status(&self, product_id: ProductId) -> Result<StatusView, EngineError> {
        self.reservations.status(product_id).await
    }

    pub async fn cleanup_holds(
        &self,
        product_id: ProductId,
    ) -> Result<CleanupOutcome, EngineError> {
        self.reservations.cleanup(product_id).await
    }

    pub async fn inspect_holds(&self, product_id: ProductId) -> Result<AllView, EngineError> {
        self.reservations.all(product_id).await
    }

    /// Stock changed (or partially changed on a shortfall): shipping-option
    /// prices derived from it are stale either way.
    fn invalidate_after(
        &self,
        product_id: ProductId,
        outcome: &Result<AllocationOutcome, EngineError>,
    ) {
        let partially_applied = matches!(
            outcome,
            Err(EngineError::Domain(DomainError::InsufficientStock(f))) if f.applied > 0
        );
        if outcome.is_ok() || partially_applied {
            self.cache.invalidate_product(product_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryShippingCache;
    use crate::ledger_store::InMemoryLedgerStore;
    use crate::reservation_store::InMemoryReservationStore;

    fn service() -> FulfillmentService<InMemoryLedgerStore, InMemoryReservationStore, InMemoryShippingCache>
    {
        FulfillmentService::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryReservationStore::new()),
            Arc::new(InMemoryShippingCache::new()),
        )
    }

    fn order(id: &str) -> OrderId {
        OrderId::new(id).unwrap()
    }

    #[tokio::test]
    async fn set_stock_then_available_round_trips() {
        let svc = service();
        let product = ProductId::new();
        let warehouse = WarehouseId::new();

        svc.set_stock(product, Some(warehouse), 50).await.unwrap();
        assert_eq!(svc.available_stock(product).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn unknown_product_has_zero_available_stock() {
        let svc = service();
        assert_eq!(svc.available_stock(ProductId::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn soft_holds_do_not_change_available_stock() {
        let svc = service();
        let product = ProductId::new();
        svc.set_stock(product, None, 50).await.unwrap();

        svc.hold(product, order("o1"), 10, None).await.unwrap();
        assert_eq!(svc.available_stock(product).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn ledger_reserve_changes_available_stock_and_release_restores_it() {
        let svc = service();
        let product = ProductId::new();
        svc.set_stock(product, None, 50).await.unwrap();

        svc.reserve_stock(product, 10, None).await.unwrap();
        assert_eq!(svc.available_stock(product).await.unwrap(), 40);

        svc.release_stock(product, 10, None).await.unwrap();
        assert_eq!(svc.available_stock(product).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn remove_stock_tombstones_the_row() {
        let svc = service();
        let product = ProductId::new();
        let warehouse = WarehouseId::new();
        svc.set_stock(product, Some(warehouse), 50).await.unwrap();

        svc.remove_stock(product, warehouse).await.unwrap();
        assert_eq!(svc.available_stock(product).await.unwrap(), 0);

        // Re-setting stock revives the tombstoned row under its identity.
        let revived = svc.set_stock(product, Some(warehouse), 5).await.unwrap();
        assert!(!revived.deleted);
        assert_eq!(svc.available_stock(product).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn commit_hold_drops_the_hold_and_deducts_the_ledger() {
        let svc = service();
        let product = ProductId::new();
        svc.set_stock(product, None, 50).await.unwrap();

        svc.hold(product, order("o1"), 8, None).await.unwrap();
        let outcome = svc
            .commit_hold(product, SelectionKey::ByOrder(order("o1")), None)
            .await
            .unwrap();

        assert_eq!(outcome.committed, 8);
        assert_eq!(outcome.total_reserved, 0);
        assert_eq!(svc.available_stock(product).await.unwrap(), 42);
        assert_eq!(svc.hold_status(product).await.unwrap().reserved, 0);
    }

    #[tokio::test]
    async fn commit_hold_with_unknown_order_commits_nothing() {
        let svc = service();
        let product = ProductId::new();
        svc.set_stock(product, None, 50).await.unwrap();

        let outcome = svc
            .commit_hold(product, SelectionKey::ByOrder(order("ghost")), None)
            .await
            .unwrap();

        assert_eq!(outcome.committed, 0);
        assert!(outcome.allocation.is_none());
        assert_eq!(svc.available_stock(product).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn batch_lookup_reports_each_product() {
        let svc = service();
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        svc.set_stock(p1, None, 3).await.unwrap();

        let batch = svc.available_stock_batch(&[p1, p2]).await.unwrap();
        assert_eq!(batch, vec![(p1, 3), (p2, 0)]);
    }

    #[tokio::test]
    async fn stock_mutations_invalidate_the_product_cache_scope() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let reservations = Arc::new(InMemoryReservationStore::new());
        let cache = Arc::new(InMemoryShippingCache::new());
        let svc = FulfillmentService::new(ledger, reservations, cache.clone());

        let product = ProductId::new();
        let other = ProductId::new();
        svc.set_stock(product, None, 50).await.unwrap();

        cache.put(format!("shipping:{product}:zone-a"), serde_json::json!(9.5));
        cache.put(format!("shipping:{other}:zone-a"), serde_json::json!(4.0));

        svc.reduce_stock(product, 1, None).await.unwrap();

        assert!(cache.get(&format!("shipping:{product}:zone-a")).is_none());
        assert!(cache.get(&format!("shipping:{other}:zone-a")).is_some());
    }
}
