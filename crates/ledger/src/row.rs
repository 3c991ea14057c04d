//! Ledger rows: one per product x warehouse, plus the derived aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockgate_core::{DomainError, DomainResult, InventoryId, ProductId, WarehouseId};

/// Persistent record of physical stock for one (product, warehouse) pair.
///
/// `reserved_quantity` is the legacy hard-reservation column, mutated by the
/// ledger reserve/release path. The invariant `reserved_quantity <= quantity`
/// must be repaired, never assumed (see [`InventoryRow::needs_repair`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub inventory_id: InventoryId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub updated_at: DateTime<Utc>,
    /// Tombstone: excluded from every aggregate read, never hard-deleted.
    pub deleted: bool,
}

impl InventoryRow {
    /// Create a fresh row. Quantities are validated at the boundary so the
    /// rest of the crate can assume non-negative values.
    pub fn new(
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(Self {
            inventory_id: InventoryId::new(),
            product_id,
            warehouse_id,
            quantity,
            reserved_quantity: 0,
            updated_at: now,
            deleted: false,
        })
    }

    /// Available capacity: `quantity - reserved_quantity`, floored at 0 even
    /// if data drift would make it negative.
    pub fn available(&self) -> i64 {
        (self.quantity - self.reserved_quantity).max(0)
    }

    /// True when `reserved_quantity` has drifted above `quantity` and must be
    /// clamped before availability is computed.
    pub fn needs_repair(&self) -> bool {
        self.reserved_quantity > self.quantity
    }

    /// Clamp `reserved_quantity` to `quantity`. Returns true when the row
    /// changed (callers persist only on change).
    pub fn repair(&mut self, now: DateTime<Utc>) -> bool {
        if !self.needs_repair() {
            return false;
        }
        self.reserved_quantity = self.quantity;
        self.updated_at = now;
        true
    }

    /// Replace the physical quantity (stock set/update path).
    pub fn set_quantity(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        self.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }
}

/// Product-level stock figures derived from all non-deleted rows.
///
/// Not stored anywhere; recomputed on read.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStock {
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub available: i64,
}

impl AggregateStock {
    /// Aggregate a product's rows. Tombstoned rows are skipped; a product
    /// with no rows at all aggregates to zeros, not an error.
    ///
    /// `available` is the sum of per-row availability (each floored at 0),
    /// which matches what the allocation walk can actually take.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a InventoryRow>) -> Self {
        let mut agg = Self::default();
        for row in rows {
            if row.deleted {
                continue;
            }
            agg.quantity += row.quantity;
            agg.reserved_quantity += row.reserved_quantity;
            agg.available += row.available();
        }
        agg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i64, reserved: i64) -> InventoryRow {
        let mut r = InventoryRow::new(ProductId::new(), WarehouseId::new(), quantity, Utc::now())
            .unwrap();
        r.reserved_quantity = reserved;
        r
    }

    #[test]
    fn new_row_rejects_negative_quantity() {
        let err = InventoryRow::new(ProductId::new(), WarehouseId::new(), -1, Utc::now());
        assert!(err.is_err());
    }

    #[test]
    fn available_is_floored_at_zero() {
        assert_eq!(row(10, 3).available(), 7);
        assert_eq!(row(10, 12).available(), 0);
    }

    #[test]
    fn repair_clamps_reserved_to_quantity() {
        let mut r = row(10, 12);
        assert!(r.needs_repair());
        assert!(r.repair(Utc::now()));
        assert_eq!(r.reserved_quantity, 10);
        // Second pass is a no-op.
        assert!(!r.repair(Utc::now()));
    }

    #[test]
    fn aggregate_skips_tombstoned_rows() {
        let mut dead = row(50, 0);
        dead.deleted = true;
        let live = row(10, 4);

        let agg = AggregateStock::from_rows([&dead, &live]);
        assert_eq!(agg.quantity, 10);
        assert_eq!(agg.reserved_quantity, 4);
        assert_eq!(agg.available, 6);
    }

    #[test]
    fn aggregate_of_no_rows_is_zero() {
        let agg = AggregateStock::from_rows(std::iter::empty());
        assert_eq!(agg, AggregateStock::default());
    }
}
