//! Engine-level error: domain failures plus infrastructure failures.

use thiserror::Error;

use stockgate_core::DomainError;

use crate::ledger_store::LedgerStoreError;
use crate::reservation_store::ReservationStoreError;

/// Error surfaced by the facade and the actor runtime.
///
/// Domain failures pass through untouched so callers keep the full taxonomy
/// (validation vs conflict vs not-found); store failures are wrapped, never
/// silently swallowed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("ledger store error: {0}")]
    LedgerStore(#[from] LedgerStoreError),

    #[error("reservation store error: {0}")]
    ReservationStore(#[from] ReservationStoreError),

    /// The per-product actor's mailbox is gone (task panicked or shut down).
    #[error("reservation actor unavailable")]
    ActorUnavailable,
}

impl EngineError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(e) => Some(e),
            _ => None,
        }
    }
}
