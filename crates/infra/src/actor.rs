//! Per-product reservation actors.
//!
//! One mailbox task per product id, spawned lazily on first use. Commands
//! carry a oneshot reply channel; arrival order at the mailbox is the total
//! order of soft-reservation operations for that product. Different products
//! get independent actors and proceed in parallel with no coordination.
//!
//! The actor is the exclusive owner of its product's `ReservationSet`. State
//! is loaded from the `ReservationStore` on first command and persisted
//! after every mutation, so restarts do not lose holds. If a save fails the
//! in-memory mutation is rolled back and the error returned: an operation
//! either fully applies (memory + durable copy) or leaves state untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use stockgate_core::{OrderId, ProductId};
use stockgate_reservations::{
    AllView, CleanupOutcome, ReduceOutcome, ReleaseOutcome, ReservationSet, ReserveOutcome,
    SelectionKey, StatusView,
};

use crate::error::EngineError;
use crate::reservation_store::ReservationStore;

const MAILBOX_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum Command {
    Reserve {
        order_id: OrderId,
        quantity: i64,
        ttl_minutes: Option<i64>,
        reply: Reply<ReserveOutcome>,
    },
    Release {
        key: SelectionKey,
        reply: Reply<ReleaseOutcome>,
    },
    Reduce {
        key: SelectionKey,
        reply: Reply<ReduceOutcome>,
    },
    Status {
        reply: Reply<StatusView>,
    },
    Cleanup {
        reply: Reply<CleanupOutcome>,
    },
    All {
        reply: Reply<AllView>,
    },
}

/// Routes soft-reservation operations to the owning product actor.
pub struct ReservationService<R: ReservationStore> {
    store: Arc<R>,
    mailboxes: Mutex<HashMap<ProductId, mpsc::Sender<Command>>>,
}

impl<R: ReservationStore> ReservationService<R> {
    pub fn new(store: Arc<R>) -> Self {
        Self {
            store,
            mailboxes: Mutex::new(HashMap::new()),
        }
    }

    /// The mailbox for a product, spawning the actor on first access.
    fn mailbox(&self, product_id: ProductId) -> mpsc::Sender<Command> {
        let mut mailboxes = self.mailboxes.lock().unwrap();
        if let Some(tx) = mailboxes.get(&product_id) {
            if !tx.is_closed() {
                return tx.clone();
            }
            // The task is gone (panicked); replace it below.
            mailboxes.remove(&product_id);
        }

        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        tokio::spawn(run_actor(product_id, self.store.clone(), rx));
        mailboxes.insert(product_id, tx.clone());
        tx
    }

    async fn send<T>(
        &self,
        product_id: ProductId,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.mailbox(product_id)
            .send(make(reply))
            .await
            .map_err(|_| EngineError::ActorUnavailable)?;
        rx.await.map_err(|_| EngineError::ActorUnavailable)?
    }

    pub async fn reserve(
        &self,
        product_id: ProductId,
        order_id: OrderId,
        quantity: i64,
        ttl_minutes: Option<i64>,
    ) -> Result<ReserveOutcome, EngineError> {
        self.send(product_id, |reply| Command::Reserve {
            order_id,
            quantity,
            ttl_minutes,
            reply,
        })
        .await
    }

    pub async fn release(
        &self,
        product_id: ProductId,
        key: SelectionKey,
    ) -> Result<ReleaseOutcome, EngineError> {
        self.send(product_id, |reply| Command::Release { key, reply })
            .await
    }

    pub async fn reduce(
        &self,
        product_id: ProductId,
        key: SelectionKey,
    ) -> Result<ReduceOutcome, EngineError> {
        self.send(product_id, |reply| Command::Reduce { key, reply })
            .await
    }

    pub async fn status(&self, product_id: ProductId) -> Result<StatusView, EngineError> {
        self.send(product_id, |reply| Command::Status { reply }).await
    }

    pub async fn cleanup(&self, product_id: ProductId) -> Result<CleanupOutcome, EngineError> {
        self.send(product_id, |reply| Command::Cleanup { reply }).await
    }

    pub async fn all(&self, product_id: ProductId) -> Result<AllView, EngineError> {
        self.send(product_id, |reply| Command::All { reply }).await
    }
}

async fn run_actor<R: ReservationStore>(
    product_id: ProductId,
    store: Arc<R>,
    mut rx: mpsc::Receiver<Command>,
) {
    info!(product = %product_id, "reservation actor started");

    // Loaded lazily so a store outage at spawn time fails commands instead
    // of silently starting from an empty set.
    let mut state: Option<ReservationSet> = None;

    while let Some(command) = rx.recv().await {
        let now = Utc::now();

        if state.is_none() {
            match store.load(product_id).await {
                Ok(loaded) => {
                    state = Some(loaded.unwrap_or_else(|| ReservationSet::new(now)));
                }
                Err(e) => {
                    error!(product = %product_id, error = %e, "failed to load reservation set");
                    reply_store_error(command, e);
                    continue;
                }
            }
        }
        let set = state.as_mut().unwrap();
        let snapshot = set.clone();

        // Expiry sweep before every operation, unless the operation *is* the
        // sweep or the diagnostic view (which reports expired entries).
        let swept = match &command {
            Command::Cleanup { .. } | Command::All { .. } => 0,
            _ => set.sweep(now),
        };

        match command {
            Command::Reserve {
                order_id,
                quantity,
                ttl_minutes,
                reply,
            } => {
                let result = set.reserve(order_id, quantity, ttl_minutes, now);
                let dirty = result.is_ok() || swept > 0;
                let result = persist_or_rollback(&*store, product_id, set, snapshot, dirty, result)
                    .await;
                let _ = reply.send(result);
            }
            Command::Release { key, reply } => {
                let result = set.release(key, now);
                let dirty = swept > 0 || matches!(&result, Ok(o) if o.released > 0);
                let result = persist_or_rollback(&*store, product_id, set, snapshot, dirty, result)
                    .await;
                let _ = reply.send(result);
            }
            Command::Reduce { key, reply } => {
                let result = set.reduce(key, now);
                let dirty = swept > 0 || matches!(&result, Ok(o) if o.reduced > 0);
                let result = persist_or_rollback(&*store, product_id, set, snapshot, dirty, result)
                    .await;
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let result = Ok(set.status());
                let result = persist_or_rollback(
                    &*store,
                    product_id,
                    set,
                    snapshot,
                    swept > 0,
                    result,
                )
                .await;
                let _ = reply.send(result);
            }
            Command::Cleanup { reply } => {
                let cleaned = set.sweep(now);
                let outcome = CleanupOutcome {
                    cleaned,
                    total_reserved: set.total_reserved(),
                };
                let result = persist_or_rollback(
                    &*store,
                    product_id,
                    set,
                    snapshot,
                    cleaned > 0,
                    Ok(outcome),
                )
                .await;
                let _ = reply.send(result);
            }
            Command::All { reply } => {
                let _ = reply.send(Ok(set.all(now)));
            }
        }
    }

    info!(product = %product_id, "reservation actor stopped");
}

/// Persist the mutated set; on save failure restore the pre-operation
/// snapshot so memory and the durable copy never diverge.
async fn persist_or_rollback<R: ReservationStore, T>(
    store: &R,
    product_id: ProductId,
    set: &mut ReservationSet,
    snapshot: ReservationSet,
    dirty: bool,
    result: Result<T, stockgate_core::DomainError>,
) -> Result<T, EngineError> {
    if !dirty {
        return result.map_err(EngineError::from);
    }

    if let Err(e) = store.save(product_id, set).await {
        error!(product = %product_id, error = %e, "failed to persist reservation set, rolling back");
        *set = snapshot;
        return Err(e.into());
    }

    result.map_err(EngineError::from)
}

fn reply_store_error(command: Command, error: crate::reservation_store::ReservationStoreError) {
    let error = EngineError::from(error);
    match command {
        Command::Reserve { reply, .. } => {
            let _ = reply.send(Err(error));
        }
        Command::Release { reply, .. } => {
            let _ = reply.send(Err(error));
        }
        Command::Reduce { reply, .. } => {
            let _ = reply.send(Err(error));
        }
        Command::Status { reply } => {
            let _ = reply.send(Err(error));
        }
        Command::Cleanup { reply } => {
            let _ = reply.send(Err(error));
        }
        Command::All { reply } => {
            let _ = reply.send(Err(error));
        }
    }
}
