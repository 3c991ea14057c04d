//! `stockgate-ledger` — warehouse ledger model and allocation policy.
//!
//! Pure domain: row/aggregate types and the greedy warehouse-selection
//! policy. All I/O (durable rows, conditional updates) lives in
//! `stockgate-infra`.

pub mod allocation;
pub mod row;

pub use allocation::{StockOperation, ranked_for, take_amount};
pub use row::{AggregateStock, InventoryRow};
