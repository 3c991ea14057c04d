//! Request bodies and the selection-key validation shared by release/commit.

use serde::Deserialize;

use stockgate_core::{DomainError, DomainResult, OrderId, WarehouseId};
use stockgate_reservations::SelectionKey;

#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub order_id: String,
    pub quantity: i64,
    pub ttl_minutes: Option<i64>,
}

/// Release/commit bodies carry either an order id or a plain quantity.
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub order_id: Option<String>,
    pub quantity: Option<i64>,
    pub warehouse_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct StockChangeRequest {
    pub quantity: i64,
    pub warehouse_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchStockRequest {
    pub product_ids: Vec<String>,
}

impl SelectionRequest {
    /// Exhaustive validation of the order-id/quantity alternation: exactly
    /// one must be present.
    pub fn selection_key(&self) -> DomainResult<SelectionKey> {
        match (&self.order_id, self.quantity) {
            (Some(order_id), None) => Ok(SelectionKey::ByOrder(OrderId::new(order_id.clone())?)),
            (None, Some(quantity)) => Ok(SelectionKey::ByQuantity(quantity)),
            (Some(_), Some(_)) => Err(DomainError::validation(
                "provide either order_id or quantity, not both",
            )),
            (None, None) => Err(DomainError::validation(
                "one of order_id or quantity is required",
            )),
        }
    }

    pub fn preferred_warehouse(&self) -> DomainResult<Option<WarehouseId>> {
        self.warehouse_id
            .as_deref()
            .map(str::parse)
            .transpose()
    }
}

impl StockChangeRequest {
    pub fn preferred_warehouse(&self) -> DomainResult<Option<WarehouseId>> {
        self.warehouse_id
            .as_deref()
            .map(str::parse)
            .transpose()
    }
}
