//! In-memory shipping cache for dev/test.

use std::collections::HashMap;
use std::sync::Mutex;

use stockgate_core::ProductId;

use super::{ShippingCache, product_key_prefix};

#[derive(Debug, Default)]
pub struct InMemoryShippingCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryShippingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.lock().unwrap().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ShippingCache for InMemoryShippingCache {
    fn invalidate_product(&self, product_id: ProductId) {
        let prefix = product_key_prefix(product_id);
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(&prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_is_scoped_to_the_product_prefix() {
        let cache = InMemoryShippingCache::new();
        let p1 = ProductId::new();
        let p2 = ProductId::new();

        cache.put(format!("shipping:{p1}:zone-a"), serde_json::json!(1));
        cache.put(format!("shipping:{p1}:zone-b"), serde_json::json!(2));
        cache.put(format!("shipping:{p2}:zone-a"), serde_json::json!(3));

        cache.invalidate_product(p1);

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&format!("shipping:{p2}:zone-a")).is_some());
    }
}
