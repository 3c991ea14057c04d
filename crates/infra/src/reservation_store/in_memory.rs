//! In-memory reservation store for dev/test.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockgate_core::ProductId;
use stockgate_reservations::ReservationSet;

use super::{ReservationStore, ReservationStoreError};

#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    sets: RwLock<HashMap<ProductId, ReservationSet>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn load(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ReservationSet>, ReservationStoreError> {
        let sets = self
            .sets
            .read()
            .map_err(|_| ReservationStoreError::Query("reservation lock poisoned".to_string()))?;
        Ok(sets.get(&product_id).cloned())
    }

    async fn save(
        &self,
        product_id: ProductId,
        set: &ReservationSet,
    ) -> Result<(), ReservationStoreError> {
        let mut sets = self
            .sets
            .write()
            .map_err(|_| ReservationStoreError::Write("reservation lock poisoned".to_string()))?;
        sets.insert(product_id, set.clone());
        Ok(())
    }
}
