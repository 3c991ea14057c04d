//! Shipping-option cache invalidation.
//!
//! Shipping pricing memoizes per-warehouse availability, so every
//! stock-affecting call invalidates the product's key prefix. Invalidation
//! is advisory: failures are logged, never propagated into the stock path.

mod in_memory;
#[cfg(feature = "redis")]
mod redis_cache;

pub use in_memory::InMemoryShippingCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisShippingCache;

use stockgate_core::ProductId;

/// Cache keys are namespaced `shipping:{product_id}:{suffix}`.
pub fn product_key_prefix(product_id: ProductId) -> String {
    format!("shipping:{product_id}:")
}

pub trait ShippingCache: Send + Sync + 'static {
    /// Drop every cached entry scoped to this product.
    fn invalidate_product(&self, product_id: ProductId);
}

/// No-op cache for wiring that doesn't memoize shipping options.
#[derive(Debug, Default)]
pub struct NoopShippingCache;

impl ShippingCache for NoopShippingCache {
    fn invalidate_product(&self, _product_id: ProductId) {}
}
