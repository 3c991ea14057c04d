//! Greedy allocation against the ledger store.
//!
//! Walks the ranked warehouse order from `stockgate-ledger`, applying one
//! guarded write per row. A failed guard contributes zero and the walk moves
//! on, so concurrent allocators racing on the same row resolve within one
//! call instead of erroring out. Writes applied before a shortfall are not
//! rolled back; the conflict error reports how much was applied.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use stockgate_core::{DomainError, ProductId, StockFigures, WarehouseId};
use stockgate_ledger::{AggregateStock, StockOperation, ranked_for, take_amount};

use crate::error::EngineError;
use crate::ledger_store::LedgerStore;

/// One applied step of an allocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStep {
    pub warehouse_id: WarehouseId,
    pub amount: i64,
}

/// A fully satisfied allocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AllocationOutcome {
    pub applied: i64,
    pub steps: Vec<AllocationStep>,
}

/// Satisfy `quantity` for a product by draining ranked warehouses.
///
/// The repair pass runs on the reduce path only: reduce is the commit path
/// that must never silently oversell, so drifted `reserved > quantity` rows
/// are clamped before availability is computed.
pub async fn allocate<L: LedgerStore>(
    store: &L,
    product_id: ProductId,
    quantity: i64,
    operation: StockOperation,
    preferred: Option<WarehouseId>,
    now: DateTime<Utc>,
) -> Result<AllocationOutcome, EngineError> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive").into());
    }

    let mut rows = store.rows_for_product(product_id).await?;
    if rows.is_empty() {
        return Err(DomainError::not_found().into());
    }

    if operation == StockOperation::Reduce {
        for row in rows.iter_mut() {
            if row.needs_repair() {
                warn!(
                    product = %product_id,
                    warehouse = %row.warehouse_id,
                    reserved = row.reserved_quantity,
                    quantity = row.quantity,
                    "clamping drifted reserved_quantity"
                );
                store.repair_row(product_id, row.warehouse_id, now).await?;
                row.repair(now);
            }
        }
    }

    let snapshot = AggregateStock::from_rows(rows.iter());
    let walk = ranked_for(rows, operation, preferred, quantity);

    let mut remaining = quantity;
    let mut steps = Vec::new();

    for row in &walk {
        if remaining == 0 {
            break;
        }
        let take = take_amount(remaining, operation.capacity_of(row));
        if take == 0 {
            continue;
        }

        if store
            .try_apply(product_id, row.warehouse_id, operation, take, now)
            .await?
        {
            remaining -= take;
            steps.push(AllocationStep {
                warehouse_id: row.warehouse_id,
                amount: take,
            });
        } else {
            // Another writer beat us to this row; it contributes zero and
            // the next ranked row absorbs the remainder.
            debug!(
                product = %product_id,
                warehouse = %row.warehouse_id,
                take,
                "conditional update lost the race, moving to next warehouse"
            );
        }
    }

    if remaining > 0 {
        let figures = StockFigures {
            requested: quantity,
            available: snapshot.available,
            total: snapshot.quantity,
            reserved: snapshot.reserved_quantity,
            applied: quantity - remaining,
        };
        warn!(
            product = %product_id,
            requested = quantity,
            applied = figures.applied,
            available = figures.available,
            "allocation shortfall"
        );
        return Err(DomainError::insufficient_stock(figures).into());
    }

    Ok(AllocationOutcome {
        applied: quantity,
        steps,
    })
}
