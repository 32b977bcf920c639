//! # Read-Through Cache
//!
//! [`ReadThroughCache`] sits in front of any [`Repository`] and implements the same
//! trait, so services cannot tell whether they talk to the cache or the store.
//!
//! - `get` serves hits from memory and populates on miss.
//! - `save`, `update_by_id` and `delete_by_id` go to the store first and are reflected
//!   into memory only after the store confirmed them. The cache therefore never holds a
//!   record the store has not produced.
//! - [`refresh`](ReadThroughCache::refresh) reloads the whole table in one page and
//!   replaces both collections under the write lock. [`spawn_refresh`] runs it on a timer
//!   as the backstop that bounds staleness.
//!
//! All state sits behind one `tokio::sync::RwLock`. Only a refresh holds it across a
//! store call.
//!
//! Writes and cache misses for one id also take a per-id key lock that is held until the
//! result has been reflected. Reflections therefore land in commit order, and a miss
//! that read an older row cannot overwrite a newer one.
//!
//! [`spawn_refresh`]: ReadThroughCache::spawn_refresh

use crate::entity::Record;
use crate::error::StoreError;
use crate::mutation::{Mutation, Outcome};
use crate::pagination::Pagination;
use crate::store::Repository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as KeyLock, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct CacheState<T: Record> {
    entries: HashMap<T::Id, T>,
    // Unordered mirror used for full-table reads without a store round-trip.
    listing: Vec<T>,
    refreshed_at: Option<Instant>,
}

impl<T: Record> CacheState<T> {
    fn upsert_listing(&mut self, record: &T) {
        match self.listing.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record.clone(),
            None => self.listing.push(record.clone()),
        }
    }
}

/// An in-memory mirror of a repository.
pub struct ReadThroughCache<T: Record, R> {
    inner: R,
    state: RwLock<CacheState<T>>,
    // Created on first write or miss and never removed.
    keys: Mutex<HashMap<T::Id, Arc<KeyLock<()>>>>,
}

impl<T, R> ReadThroughCache<T, R>
where
    T: Record,
    R: Repository<T>,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                listing: Vec::new(),
                refreshed_at: None,
            }),
            keys: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, id: &T::Id) -> Result<Arc<KeyLock<()>>, StoreError> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| StoreError::internal("cache key table poisoned"))?;
        Ok(keys
            .entry(id.clone())
            .or_insert_with(|| Arc::new(KeyLock::new(())))
            .clone())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    pub async fn contains(&self, id: &T::Id) -> bool {
        self.state.read().await.entries.contains_key(id)
    }

    /// Every cached record, in no particular order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.state.read().await.listing.clone()
    }

    /// Time since the last successful refresh, if any.
    pub async fn age(&self) -> Option<Duration> {
        self.state.read().await.refreshed_at.map(|at| at.elapsed())
    }

    /// Replaces the cached contents with the full table.
    ///
    /// On failure the previous contents are kept.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let kind = T::KIND;
        let mut state = self.state.write().await;

        let total = self.inner.count().await?;
        let records = if total == 0 {
            Vec::new()
        } else {
            self.inner.list(&Pagination::all(total)).await?
        };

        state.entries = records
            .iter()
            .map(|r| (r.id().clone(), r.clone()))
            .collect();
        state.listing = records;
        state.refreshed_at = Some(Instant::now());

        let size = state.listing.len();
        info!(kind, size, "Cache refreshed");
        Ok(size)
    }

    /// Runs [`refresh`](Self::refresh) every `every`, starting one interval from now.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()>
    where
        R: 'static,
    {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = cache.refresh().await {
                    warn!(kind = T::KIND, error = %err, "Cache refresh failed");
                }
            }
        })
    }
}

#[async_trait]
impl<T, R> Repository<T> for ReadThroughCache<T, R>
where
    T: Record,
    R: Repository<T>,
{
    async fn get(&self, id: &T::Id) -> Result<T, StoreError> {
        if let Some(hit) = self.state.read().await.entries.get(id).cloned() {
            debug!(kind = T::KIND, %id, "Cache hit");
            return Ok(hit);
        }

        let key = self.key_lock(id)?;
        let _held = key.lock().await;
        // A write may have been reflected while we waited.
        if let Some(hit) = self.state.read().await.entries.get(id).cloned() {
            return Ok(hit);
        }

        let record = self.inner.get(id).await?;
        debug!(kind = T::KIND, %id, "Cache miss");
        self.state
            .write()
            .await
            .entries
            .insert(id.clone(), record.clone());
        Ok(record)
    }

    async fn save(&self, record: &T) -> Result<(), StoreError> {
        let key = self.key_lock(record.id())?;
        let _held = key.lock().await;
        self.inner.save(record).await?;

        let mut state = self.state.write().await;
        state.entries.insert(record.id().clone(), record.clone());
        state.upsert_listing(record);
        Ok(())
    }

    async fn update_by_id<F, E>(&self, id: &T::Id, mutate: F) -> Result<Outcome<T>, E>
    where
        F: FnOnce(&T) -> Mutation<T, E> + Send,
        E: From<StoreError> + Send,
    {
        let key = self.key_lock(id)?;
        let _held = key.lock().await;
        let outcome = self.inner.update_by_id(id, mutate).await?;

        if let Outcome::Updated(record) = &outcome {
            let mut state = self.state.write().await;
            if let Some(slot) = state.entries.get_mut(id) {
                *slot = record.clone();
            }
            if let Some(slot) = state.listing.iter_mut().find(|r| r.id() == id) {
                *slot = record.clone();
            }
        }
        Ok(outcome)
    }

    async fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError> {
        let key = self.key_lock(id)?;
        let _held = key.lock().await;
        let result = self.inner.delete_by_id(id).await;

        let mut state = self.state.write().await;
        state.entries.remove(id);
        state.listing.retain(|r| r.id() != id);
        result
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<T>, StoreError> {
        self.inner.list(pagination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::pagination::SortOption;
    use crate::store::{StoreAdapter, Table};
    use std::cmp::Ordering;

    #[derive(Debug, Clone, PartialEq)]
    struct Sku {
        id: u32,
        on_hand: i64,
    }

    impl Record for Sku {
        type Id = u32;
        const KIND: &'static str = "sku";

        fn id(&self) -> &u32 {
            &self.id
        }

        fn compare_by(&self, other: &Self, _sort: Option<SortOption>) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    fn sku(id: u32, on_hand: i64) -> Sku {
        Sku { id, on_hand }
    }

    fn cached(store: &MemoryStore<Sku>) -> ReadThroughCache<Sku, Table<MemoryStore<Sku>>> {
        ReadThroughCache::new(Table::new(store.clone()))
    }

    #[tokio::test]
    async fn get_after_save_is_served_from_memory() {
        let store = MemoryStore::new();
        let cache = cached(&store);

        cache.save(&sku(1, 4)).await.unwrap();
        let reads = store.stats().reads();

        assert_eq!(cache.get(&1).await.unwrap(), sku(1, 4));
        assert_eq!(store.stats().reads(), reads);
    }

    #[tokio::test]
    async fn miss_populates_then_hits() {
        let store = MemoryStore::with_records([sku(1, 4)]);
        let cache = cached(&store);

        cache.get(&1).await.unwrap();
        cache.get(&1).await.unwrap();
        assert_eq!(store.stats().reads(), 1);
        assert!(cache.contains(&1).await);
    }

    #[tokio::test]
    async fn failed_save_leaves_cache_untouched() {
        let store = MemoryStore::with_records([sku(1, 4)]);
        let cache = cached(&store);

        let err = cache.save(&sku(1, 9)).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn rejected_update_is_not_reflected() {
        let store = MemoryStore::with_records([sku(1, 4)]);
        let cache = cached(&store);
        cache.get(&1).await.unwrap();

        let result: Result<Outcome<Sku>, StoreError> = cache
            .update_by_id(&1, |_| Mutation::Rejected(StoreError::NotUpdated))
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get(&1).await.unwrap().on_hand, 4);
    }

    #[tokio::test]
    async fn committed_update_is_reflected() {
        let store = MemoryStore::with_records([sku(1, 4)]);
        let cache = cached(&store);
        cache.refresh().await.unwrap();

        let outcome: Outcome<Sku> = cache
            .update_by_id::<_, StoreError>(&1, |s| Mutation::Changed(sku(s.id, s.on_hand - 1)))
            .await
            .unwrap();
        assert!(outcome.is_updated());
        assert_eq!(cache.get(&1).await.unwrap().on_hand, 3);
        assert_eq!(cache.snapshot().await, vec![sku(1, 3)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_updates_leave_cache_equal_to_store() {
        for round in 0..50 {
            let store = MemoryStore::with_records([sku(1, 100)]);
            let cache = Arc::new(cached(&store));
            cache.refresh().await.unwrap();

            let mut tasks = Vec::new();
            for _ in 0..16 {
                let cache = Arc::clone(&cache);
                tasks.push(tokio::spawn(async move {
                    cache
                        .update_by_id::<_, StoreError>(&1, |s| {
                            Mutation::Changed(sku(s.id, s.on_hand - 1))
                        })
                        .await
                }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            let stored = store.peek(&1).await.unwrap();
            assert_eq!(stored.on_hand, 84, "round {round}");
            assert_eq!(cache.get(&1).await.unwrap(), stored, "round {round}");
            assert_eq!(cache.snapshot().await, vec![stored], "round {round}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn miss_racing_an_update_keeps_the_newer_row() {
        for _ in 0..50 {
            let store = MemoryStore::with_records([sku(1, 10)]);
            let cache = Arc::new(cached(&store));

            let reader = {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get(&1).await })
            };
            let writer = {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache
                        .update_by_id::<_, StoreError>(&1, |s| {
                            Mutation::Changed(sku(s.id, s.on_hand - 3))
                        })
                        .await
                })
            };
            reader.await.unwrap().unwrap();
            writer.await.unwrap().unwrap();

            // The update must be visible whichever task ran first.
            assert_eq!(cache.get(&1).await.unwrap().on_hand, 7);
            assert_eq!(store.peek(&1).await.unwrap().on_hand, 7);
        }
    }

    #[tokio::test]
    async fn delete_evicts_even_when_store_misses() {
        let store = MemoryStore::with_records([sku(1, 4)]);
        let cache = cached(&store);
        cache.refresh().await.unwrap();

        store.delete(&1).await.unwrap();
        let err = cache.delete_by_id(&1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(!cache.contains(&1).await);
    }

    #[tokio::test]
    async fn refresh_matches_store_snapshot() {
        let store = MemoryStore::with_records([sku(1, 4), sku(2, 0), sku(3, 7)]);
        let cache = cached(&store);
        assert!(cache.age().await.is_none());

        // Written behind the cache's back.
        store.insert(&sku(4, 1)).await.unwrap();
        assert_eq!(cache.refresh().await.unwrap(), 4);
        assert_eq!(cache.len().await, 4);

        let mut cached = cache.snapshot().await;
        let mut stored = store.snapshot().await;
        cached.sort_by_key(|s| s.id);
        stored.sort_by_key(|s| s.id);
        assert_eq!(cached, stored);
        assert!(cache.age().await.is_some());
    }

    #[tokio::test]
    async fn spawned_refresh_picks_up_external_writes() {
        let store = MemoryStore::with_records([sku(1, 4)]);
        let cache = Arc::new(cached(&store));
        let task = cache.spawn_refresh(Duration::from_millis(20));

        store.insert(&sku(2, 5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.contains(&2).await);
        task.abort();
    }
}
