//! Greedy warehouse-selection policy.
//!
//! One parameterized ranking shared by reduce/reserve/release, so the
//! tie-break behavior stays consistent across operations. The walk itself
//! (per-row conditional apply against the store) lives in `stockgate-infra`;
//! this module only decides *order* and *step semantics*.

use chrono::{DateTime, Utc};

use stockgate_core::WarehouseId;

use crate::row::InventoryRow;

/// The three quantity-changing operations the ledger supports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockOperation {
    /// Permanent deduction of physical stock (the commit path).
    Reduce,
    /// Legacy hard reservation: raises `reserved_quantity`.
    Reserve,
    /// Legacy release: drains `reserved_quantity`.
    Release,
}

impl StockOperation {
    /// Capacity a row offers for this operation. Reduce and reserve consume
    /// available stock; release drains reservations, not raw stock.
    pub fn capacity_of(&self, row: &InventoryRow) -> i64 {
        match self {
            StockOperation::Reduce | StockOperation::Reserve => row.available(),
            StockOperation::Release => row.reserved_quantity,
        }
    }

    /// The write-time guard: only apply if the row can still absorb `take`.
    /// Re-validated by the store at apply time, not just at the read-time
    /// snapshot.
    pub fn guard_ok(&self, row: &InventoryRow, take: i64) -> bool {
        take >= 0 && self.capacity_of(row) >= take
    }

    /// Apply one step to a row. Callers must have checked [`guard_ok`]
    /// under whatever concurrency control the store provides.
    ///
    /// [`guard_ok`]: StockOperation::guard_ok
    pub fn apply_to(&self, row: &mut InventoryRow, take: i64, now: DateTime<Utc>) {
        match self {
            StockOperation::Reduce => row.quantity -= take,
            StockOperation::Reserve => row.reserved_quantity += take,
            StockOperation::Release => row.reserved_quantity -= take,
        }
        row.updated_at = now;
    }
}

/// Order in which warehouses absorb a requested change.
///
/// Tombstoned and zero-capacity rows are dropped. If a preferred warehouse is
/// supplied and can satisfy the whole request on its own, it goes first and
/// the rest follow ranked, so a failed conditional update on the preferred
/// row still falls through to the greedy order. Otherwise the order is
/// descending capacity for the operation, tie-broken by ascending warehouse
/// id so allocation is deterministic.
pub fn ranked_for(
    rows: Vec<InventoryRow>,
    operation: StockOperation,
    preferred: Option<WarehouseId>,
    requested: i64,
) -> Vec<InventoryRow> {
    let mut candidates: Vec<InventoryRow> = rows
        .into_iter()
        .filter(|r| !r.deleted && operation.capacity_of(r) > 0)
        .collect();

    candidates.sort_by(|a, b| {
        operation
            .capacity_of(b)
            .cmp(&operation.capacity_of(a))
            .then(a.warehouse_id.cmp(&b.warehouse_id))
    });

    if let Some(preferred) = preferred {
        let fast_path = candidates
            .iter()
            .position(|r| r.warehouse_id == preferred && operation.capacity_of(r) >= requested);
        if let Some(idx) = fast_path {
            let row = candidates.remove(idx);
            candidates.insert(0, row);
        }
    }

    candidates
}

/// How much of `remaining` one row absorbs.
pub fn take_amount(remaining: i64, capacity: i64) -> i64 {
    remaining.min(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockgate_core::ProductId;

    fn row(warehouse: WarehouseId, quantity: i64, reserved: i64) -> InventoryRow {
        let mut r = InventoryRow::new(ProductId::new(), warehouse, quantity, Utc::now()).unwrap();
        r.reserved_quantity = reserved;
        r
    }

    fn warehouses(n: usize) -> Vec<WarehouseId> {
        let mut ids: Vec<WarehouseId> = (0..n).map(|_| WarehouseId::new()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn reduce_ranks_by_descending_availability() {
        let ws = warehouses(2);
        let rows = vec![row(ws[0], 3, 0), row(ws[1], 7, 0)];

        let ranked = ranked_for(rows, StockOperation::Reduce, None, 8);
        assert_eq!(ranked[0].warehouse_id, ws[1]);
        assert_eq!(ranked[1].warehouse_id, ws[0]);
    }

    #[test]
    fn release_ranks_by_descending_reserved() {
        let ws = warehouses(2);
        let rows = vec![row(ws[0], 10, 6), row(ws[1], 10, 2)];

        let ranked = ranked_for(rows, StockOperation::Release, None, 4);
        assert_eq!(ranked[0].warehouse_id, ws[0]);
    }

    #[test]
    fn equal_capacity_ties_break_on_warehouse_id() {
        let ws = warehouses(3);
        let rows = vec![row(ws[2], 5, 0), row(ws[0], 5, 0), row(ws[1], 5, 0)];

        let ranked = ranked_for(rows, StockOperation::Reduce, None, 4);
        let order: Vec<WarehouseId> = ranked.iter().map(|r| r.warehouse_id).collect();
        assert_eq!(order, ws);
    }

    #[test]
    fn preferred_warehouse_goes_first_when_it_can_satisfy_fully() {
        let ws = warehouses(2);
        let rows = vec![row(ws[0], 5, 0), row(ws[1], 20, 0)];

        let ranked = ranked_for(rows, StockOperation::Reduce, Some(ws[0]), 4);
        assert_eq!(ranked[0].warehouse_id, ws[0]);
        // The rest stay ranked behind it.
        assert_eq!(ranked[1].warehouse_id, ws[1]);
    }

    #[test]
    fn preferred_warehouse_with_insufficient_capacity_keeps_greedy_order() {
        let ws = warehouses(2);
        let rows = vec![row(ws[0], 5, 0), row(ws[1], 20, 0)];

        let ranked = ranked_for(rows, StockOperation::Reduce, Some(ws[0]), 8);
        assert_eq!(ranked[0].warehouse_id, ws[1]);
    }

    #[test]
    fn tombstoned_and_empty_rows_are_dropped() {
        let ws = warehouses(3);
        let mut dead = row(ws[0], 50, 0);
        dead.deleted = true;
        let rows = vec![dead, row(ws[1], 0, 0), row(ws[2], 5, 0)];

        let ranked = ranked_for(rows, StockOperation::Reduce, None, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].warehouse_id, ws[2]);
    }

    #[test]
    fn guard_rejects_takes_beyond_capacity() {
        let r = row(WarehouseId::new(), 5, 2);
        assert!(StockOperation::Reduce.guard_ok(&r, 3));
        assert!(!StockOperation::Reduce.guard_ok(&r, 4));
        assert!(StockOperation::Release.guard_ok(&r, 2));
        assert!(!StockOperation::Release.guard_ok(&r, 3));
    }

    #[test]
    fn apply_mutates_the_right_column() {
        let now = Utc::now();
        let mut r = row(WarehouseId::new(), 10, 4);

        StockOperation::Reduce.apply_to(&mut r, 3, now);
        assert_eq!((r.quantity, r.reserved_quantity), (7, 4));

        StockOperation::Reserve.apply_to(&mut r, 2, now);
        assert_eq!((r.quantity, r.reserved_quantity), (7, 6));

        StockOperation::Release.apply_to(&mut r, 6, now);
        assert_eq!((r.quantity, r.reserved_quantity), (7, 0));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: a guarded apply never drives a column negative.
            #[test]
            fn guarded_apply_keeps_columns_non_negative(
                quantity in 0i64..10_000,
                reserved in 0i64..10_000,
                take in 0i64..10_000,
            ) {
                for operation in [StockOperation::Reduce, StockOperation::Reserve, StockOperation::Release] {
                    let mut r = row(WarehouseId::new(), quantity, reserved.min(quantity));
                    if operation.guard_ok(&r, take) {
                        operation.apply_to(&mut r, take, Utc::now());
                        prop_assert!(r.quantity >= 0);
                        prop_assert!(r.reserved_quantity >= 0);
                    }
                }
            }

            /// Property: ranked order is monotonically non-increasing in capacity
            /// when no preferred warehouse interferes.
            #[test]
            fn ranking_is_monotonic(capacities in proptest::collection::vec(0i64..1_000, 0..8)) {
                let rows: Vec<InventoryRow> = capacities
                    .iter()
                    .map(|&c| row(WarehouseId::new(), c, 0))
                    .collect();

                let ranked = ranked_for(rows, StockOperation::Reduce, None, 1);
                for pair in ranked.windows(2) {
                    prop_assert!(pair[0].available() >= pair[1].available());
                }
            }

            /// Property: a step never takes more than remaining or capacity.
            #[test]
            fn take_amount_is_bounded(remaining in 0i64..10_000, capacity in 0i64..10_000) {
                let take = take_amount(remaining, capacity);
                prop_assert!(take <= remaining);
                prop_assert!(take <= capacity);
            }
        }
    }
}
