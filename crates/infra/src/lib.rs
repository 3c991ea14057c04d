//! `stockgate-infra` — durable stores, per-product actors, allocation.
//!
//! Everything with an I/O boundary lives here: the ledger store (in-memory +
//! Postgres, both with conditional row updates), the reservation store, the
//! per-product reservation actor runtime, the greedy allocator that walks
//! ranked rows against the store, the shipping-option cache invalidation,
//! and the fulfillment facade that ties them together.

pub mod actor;
pub mod allocator;
pub mod cache;
pub mod error;
pub mod fulfillment;
pub mod ledger_store;
pub mod reservation_store;

pub use actor::ReservationService;
pub use allocator::{AllocationOutcome, AllocationStep, allocate};
pub use cache::{InMemoryShippingCache, NoopShippingCache, ShippingCache};
pub use error::EngineError;
pub use fulfillment::{FulfillmentService, WarehouseStock};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, LedgerStoreError};
pub use reservation_store::{InMemoryReservationStore, ReservationStore, ReservationStoreError};

pub use ledger_store::PostgresLedgerStore;
pub use reservation_store::PostgresReservationStore;
#[cfg(feature = "redis")]
pub use cache::RedisShippingCache;
