use std::sync::Arc;

use stockgate_core::{OrderId, ProductId, WarehouseId};
use stockgate_infra::{
    EngineError, FulfillmentService, InMemoryLedgerStore, InMemoryReservationStore,
    InMemoryShippingCache, WarehouseStock,
    fulfillment::CommitOutcome,
};
use stockgate_infra::allocator::AllocationOutcome;
use stockgate_ledger::{AggregateStock, InventoryRow};
use stockgate_reservations::{
    AllView, CleanupOutcome, ReleaseOutcome, ReserveOutcome, SelectionKey, StatusView,
};

#[cfg(feature = "redis")]
use stockgate_infra::{PostgresLedgerStore, PostgresReservationStore, RedisShippingCache};
#[cfg(feature = "redis")]
use sqlx::PgPool;

type InMemoryFulfillment =
    FulfillmentService<InMemoryLedgerStore, InMemoryReservationStore, InMemoryShippingCache>;

#[cfg(feature = "redis")]
type PersistentFulfillment =
    FulfillmentService<PostgresLedgerStore, PostgresReservationStore, RedisShippingCache>;

/// Service wiring selected at startup: in-memory stores for dev/test, or
/// Postgres + Redis when `USE_PERSISTENT_STORES=true`.
pub enum AppServices {
    InMemory {
        fulfillment: Arc<InMemoryFulfillment>,
    },
    #[cfg(feature = "redis")]
    Persistent {
        fulfillment: Arc<PersistentFulfillment>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services().await;
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
            return build_in_memory_services();
        }
    }

    build_in_memory_services()
}

fn build_in_memory_services() -> AppServices {
    AppServices::InMemory {
        fulfillment: Arc::new(FulfillmentService::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryReservationStore::new()),
            Arc::new(InMemoryShippingCache::new()),
        )),
    }
}

#[cfg(feature = "redis")]
async fn build_persistent_services() -> AppServices {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to Postgres");

    let cache = RedisShippingCache::new(&redis_url).expect("Failed to create Redis shipping cache");

    AppServices::Persistent {
        fulfillment: Arc::new(FulfillmentService::new(
            Arc::new(PostgresLedgerStore::new(pool.clone())),
            Arc::new(PostgresReservationStore::new(pool)),
            Arc::new(cache),
        )),
    }
}

macro_rules! delegate {
    ($self:ident, $fulfillment:ident => $body:expr) => {
        match $self {
            AppServices::InMemory { fulfillment: $fulfillment } => $body,
            #[cfg(feature = "redis")]
            AppServices::Persistent { fulfillment: $fulfillment } => $body,
        }
    };
}

impl AppServices {
    pub async fn available_stock(&self, product_id: ProductId) -> Result<i64, EngineError> {
        delegate!(self, f => f.available_stock(product_id).await)
    }

    pub async fn aggregate_stock(
        &self,
        product_id: ProductId,
    ) -> Result<AggregateStock, EngineError> {
        delegate!(self, f => f.aggregate_stock(product_id).await)
    }

    pub async fn available_stock_batch(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, i64)>, EngineError> {
        delegate!(self, f => f.available_stock_batch(product_ids).await)
    }

    pub async fn per_warehouse_stock(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WarehouseStock>, EngineError> {
        delegate!(self, f => f.per_warehouse_stock(product_id).await)
    }

    pub async fn set_stock(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        quantity: i64,
    ) -> Result<InventoryRow, EngineError> {
        delegate!(self, f => f.set_stock(product_id, warehouse_id, quantity).await)
    }

    pub async fn remove_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<(), EngineError> {
        delegate!(self, f => f.remove_stock(product_id, warehouse_id).await)
    }

    pub async fn reduce_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        preferred: Option<WarehouseId>,
    ) -> Result<AllocationOutcome, EngineError> {
        delegate!(self, f => f.reduce_stock(product_id, quantity, preferred).await)
    }

    pub async fn reserve_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        preferred: Option<WarehouseId>,
    ) -> Result<AllocationOutcome, EngineError> {
        delegate!(self, f => f.reserve_stock(product_id, quantity, preferred).await)
    }

    pub async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        preferred: Option<WarehouseId>,
    ) -> Result<AllocationOutcome, EngineError> {
        delegate!(self, f => f.release_stock(product_id, quantity, preferred).await)
    }

    pub async fn hold(
        &self,
        product_id: ProductId,
        order_id: OrderId,
        quantity: i64,
        ttl_minutes: Option<i64>,
    ) -> Result<ReserveOutcome, EngineError> {
        delegate!(self, f => f.hold(product_id, order_id, quantity, ttl_minutes).await)
    }

    pub async fn release_hold(
        &self,
        product_id: ProductId,
        key: SelectionKey,
    ) -> Result<ReleaseOutcome, EngineError> {
        delegate!(self, f => f.release_hold(product_id, key).await)
    }

    pub async fn commit_hold(
        &self,
        product_id: ProductId,
        key: SelectionKey,
        preferred: Option<WarehouseId>,
    ) -> Result<CommitOutcome, EngineError> {
        delegate!(self, f => f.commit_hold(product_id, key, preferred).await)
    }

    pub async fn hold_status(&self, product_id: ProductId) -> Result<StatusView, EngineError> {
        delegate!(self, f => f.hold_status(product_id).await)
    }

    pub async fn cleanup_holds(
        &self,
        product_id: ProductId,
    ) -> Result<CleanupOutcome, EngineError> {
        delegate!(self, f => f.cleanup_holds(product_id).await)
    }

    pub async fn inspect_holds(&self, product_id: ProductId) -> Result<AllView, EngineError> {
        delegate!(self, f => f.inspect_holds(product_id).await)
    }
}
