//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Stock figures attached to insufficient-stock conflicts so callers can
/// render a precise message without a second lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StockFigures {
    /// Units the caller asked for.
    pub requested: i64,
    /// Units actually available (quantity - reserved, floored at 0).
    pub available: i64,
    /// Total physical units across warehouses.
    pub total: i64,
    /// Units held by the ledger's reserved column.
    pub reserved: i64,
    /// Units already applied before the shortfall was detected. Per-row
    /// writes before a shortfall are not rolled back.
    pub applied: i64,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// conflicts, missing resources). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or missing input).
    /// Rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. concurrent-write guard failure, or a
    /// release larger than the active reservation total).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The ledger could not satisfy a quantity change in full.
    #[error(
        "insufficient stock: requested {} but only {} available ({} total, {} reserved)",
        .0.requested, .0.available, .0.total, .0.reserved
    )]
    InsufficientStock(StockFigures),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_stock(figures: StockFigures) -> Self {
        Self::InsufficientStock(figures)
    }
}
