//! Durable storage for per-product reservation sets.
//!
//! The actor is the only writer for a given product, so the store needs no
//! concurrency control of its own: load-on-spawn, save-after-mutation.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryReservationStore;
pub use postgres::PostgresReservationStore;

use async_trait::async_trait;
use thiserror::Error;

use stockgate_core::ProductId;
use stockgate_reservations::ReservationSet;

#[derive(Debug, Error)]
pub enum ReservationStoreError {
    #[error("reservation query failed: {0}")]
    Query(String),

    #[error("reservation write failed: {0}")]
    Write(String),

    #[error("failed to decode reservation set: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ReservationStore: Send + Sync + 'static {
    /// The persisted set for a product, `None` if it has never reserved.
    async fn load(&self, product_id: ProductId)
    -> Result<Option<ReservationSet>, ReservationStoreError>;

    /// Persist the full set (small per product; holds are short-lived).
    async fn save(
        &self,
        product_id: ProductId,
        set: &ReservationSet,
    ) -> Result<(), ReservationStoreError>;
}
