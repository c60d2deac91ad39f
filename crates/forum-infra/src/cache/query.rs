//! Query client - keyed remote reads with deduplication and invalidation.
//!
//! Views read through [`QueryClient::fetch`]; mutations call
//! [`QueryClient::invalidate`] for each key they affect once the write has
//! succeeded. Subscribers registered with [`QueryClient::subscribe`] see
//! every invalidation after the cached entry is gone, so a refetch they
//! trigger always goes to the backend.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, broadcast};

use forum_core::ports::{Cache, QueryKey};

/// Per-key coordination state.
#[derive(Default)]
struct Slot {
    /// Held for the whole remote call; concurrent readers of the key wait
    /// here and then read the freshly cached value.
    fetch: Mutex<()>,
    /// Serializes "store result" against "invalidate".
    commit: Mutex<()>,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

pub struct QueryClient {
    cache: Arc<dyn Cache>,
    slots: Mutex<HashMap<QueryKey, Arc<Slot>>>,
    stale_time: Option<Duration>,
    invalidations: broadcast::Sender<QueryKey>,
}

impl QueryClient {
    /// `stale_time` bounds how long a result is served without refetching;
    /// `None` keeps results until invalidated and zero never caches.
    pub fn new(cache: Arc<dyn Cache>, stale_time: Option<Duration>) -> Self {
        let (invalidations, _) = broadcast::channel(64);
        Self {
            cache,
            slots: Mutex::new(HashMap::new()),
            stale_time,
            invalidations,
        }
    }

    async fn slot(&self, key: QueryKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().await;
        slots.entry(key).or_default().clone()
    }

    async fn read<T: DeserializeOwned>(&self, key: QueryKey) -> Option<T> {
        let raw = self.cache.get(&key.to_string()).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(query = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Cached value for `key`, if present and fresh.
    pub async fn peek<T: DeserializeOwned>(&self, key: QueryKey) -> Option<T> {
        self.read(key).await
    }

    /// Return the cached result for `key`, or run `fetcher` and cache what
    /// it returns. Errors are passed through and never cached.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.read(key).await {
            tracing::trace!(query = %key, "Cache hit");
            return Ok(hit);
        }

        let slot = self.slot(key).await;
        let _in_flight = slot.fetch.lock().await;

        if let Some(hit) = self.read(key).await {
            tracing::trace!(query = %key, "Filled by concurrent fetch");
            return Ok(hit);
        }

        let generation = slot.generation.load(Ordering::Acquire);
        tracing::debug!(query = %key, "Fetching");
        let value = fetcher().await?;

        if self.stale_time.is_some_and(|t| t.is_zero()) {
            return Ok(value);
        }

        let _commit = slot.commit.lock().await;
        if slot.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(query = %key, "Invalidated while in flight; result not cached");
            return Ok(value);
        }

        match serde_json::to_string(&value) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&key.to_string(), &json, self.stale_time).await {
                    tracing::warn!(query = %key, error = %e, "Failed to cache query result");
                }
            }
            Err(e) => tracing::warn!(query = %key, error = %e, "Query result not serializable"),
        }

        Ok(value)
    }

    /// Mark `key` stale. The next read refetches, and any fetch already in
    /// flight will not cache its result.
    pub async fn invalidate(&self, key: QueryKey) {
        let slot = self.slot(key).await;
        {
            let _commit = slot.commit.lock().await;
            slot.generation.fetch_add(1, Ordering::AcqRel);
            if let Err(e) = self.cache.delete(&key.to_string()).await {
                tracing::warn!(query = %key, error = %e, "Failed to drop cached query");
            }
        }

        tracing::debug!(query = %key, "Query invalidated");
        // No receivers is fine.
        let _ = self.invalidations.send(key);
    }

    pub async fn invalidate_many(&self, keys: &[QueryKey]) {
        for key in keys {
            self.invalidate(*key).await;
        }
    }

    /// Invalidate `keys` and drop their per-key state, for queries whose
    /// subject no longer exists.
    pub async fn forget(&self, keys: &[QueryKey]) {
        self.invalidate_many(keys).await;
        let mut slots = self.slots.lock().await;
        for key in keys {
            slots.remove(key);
        }
    }

    /// Receive every key invalidated from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidations.subscribe()
    }
}
