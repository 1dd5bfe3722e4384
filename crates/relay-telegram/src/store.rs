//! Session store.
//!
//! [`SessionStore`] is a plain keyed map. Read-modify-write sequences on one
//! customer are serialized by the caller through [`KeyedLocks`], so a store
//! implementation only has to make individual calls atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use relay_models::{CustomerId, Session};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::error::Result;

/// Storage for customer sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a customer's session.
    async fn get(&self, customer: CustomerId) -> Result<Option<Session>>;

    /// Create or replace a session.
    async fn upsert(&self, session: Session) -> Result<()>;

    /// All sessions, in no particular order.
    async fn list(&self) -> Result<Vec<Session>>;

    /// Remove a session, returning it if it existed.
    async fn remove(&self, customer: CustomerId) -> Result<Option<Session>>;
}

/// Process-local session store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<CustomerId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, customer: CustomerId) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(&customer).cloned())
    }

    async fn upsert(&self, session: Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.customer_id, session);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }

    async fn remove(&self, customer: CustomerId) -> Result<Option<Session>> {
        Ok(self.sessions.write().await.remove(&customer))
    }
}

/// One async mutex per customer.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<CustomerId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a customer's session.
    pub async fn lock(&self, customer: CustomerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(locks.entry(customer).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop a customer's lock if nobody holds or waits on it.
    pub fn forget(&self, customer: CustomerId) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if locks
            .get(&customer)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&customer);
        }
    }

    /// Number of tracked customers.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remove unclaimed sessions idle for longer than `ttl`.
///
/// Returns the customers whose sessions were removed.
pub async fn prune_stale(
    store: &dyn SessionStore,
    locks: &KeyedLocks,
    ttl: Duration,
) -> Result<Vec<CustomerId>> {
    let candidates: Vec<CustomerId> = store
        .list()
        .await?
        .into_iter()
        .filter(|s| s.is_stale(Utc::now(), ttl))
        .map(|s| s.customer_id)
        .collect();

    let mut pruned = Vec::new();
    for customer in candidates {
        let guard = locks.lock(customer).await;
        // Re-check under the lock; the customer may have written meanwhile.
        let still_stale = store
            .get(customer)
            .await?
            .is_some_and(|s| s.is_stale(Utc::now(), ttl));
        if still_stale {
            store.remove(customer).await?;
            pruned.push(customer);
            debug!(customer_id = %customer, "Pruned stale session");
        }
        drop(guard);
        locks.forget(customer);
    }

    if !pruned.is_empty() {
        info!(count = pruned.len(), "Pruned stale sessions");
    }
    Ok(pruned)
}
