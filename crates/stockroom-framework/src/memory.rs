//! # In-Memory Store
//!
//! [`MemoryStore`] is a [`StoreAdapter`] that keeps committed rows in a map and emulates
//! `SELECT ... FOR UPDATE` with one async mutex per identity. A transaction holds the
//! owned guard of every row it locked, buffers its writes, and applies them on commit.
//!
//! The store counts reads and writes in [`StoreStats`] so tests can tell whether a call
//! reached the store at all.

use crate::entity::Record;
use crate::error::StoreError;
use crate::pagination::Pagination;
use crate::store::{StoreAdapter, Transaction};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard, RwLock};
use tracing::trace;

/// Read/write counters for one [`MemoryStore`].
#[derive(Debug, Default)]
pub struct StoreStats {
    reads: AtomicU64,
    writes: AtomicU64,
}

impl StoreStats {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

struct Shared<T: Record> {
    rows: RwLock<HashMap<T::Id, T>>,
    // One lock per identity, created on first use and never removed.
    locks: Mutex<HashMap<T::Id, Arc<RowLock<()>>>>,
    stats: StoreStats,
}

/// Transactional in-memory table. Cloning shares the same rows.
pub struct MemoryStore<T: Record> {
    shared: Arc<Shared<T>>,
}

impl<T: Record> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self::from_rows(HashMap::new())
    }

    /// Builds a store pre-populated with `records`, without touching the counters.
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        Self::from_rows(records.into_iter().map(|r| (r.id().clone(), r)).collect())
    }

    fn from_rows(rows: HashMap<T::Id, T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                rows: RwLock::new(rows),
                locks: Mutex::new(HashMap::new()),
                stats: StoreStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> &StoreStats {
        &self.shared.stats
    }

    /// Committed state of one row, bypassing locks and counters.
    pub async fn peek(&self, id: &T::Id) -> Option<T> {
        self.shared.rows.read().await.get(id).cloned()
    }

    /// Committed state of the whole table, bypassing locks and counters.
    pub async fn snapshot(&self) -> Vec<T> {
        self.shared.rows.read().await.values().cloned().collect()
    }

    fn row_lock(&self, id: &T::Id) -> Result<Arc<RowLock<()>>, StoreError> {
        let mut locks = self
            .shared
            .locks
            .lock()
            .map_err(|_| StoreError::internal("row lock table poisoned"))?;
        Ok(locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(RowLock::new(())))
            .clone())
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTx<T: Record> {
    store: MemoryStore<T>,
    held: Vec<OwnedMutexGuard<()>>,
    pending: Vec<T>,
}

#[async_trait]
impl<T: Record> Transaction<T> for MemoryTx<T> {
    async fn fetch_for_update(&mut self, id: &T::Id) -> Result<T, StoreError> {
        let lock = self.store.row_lock(id)?;
        let guard = lock.lock_owned().await;
        self.store.shared.stats.read();
        let row = self.store.shared.rows.read().await.get(id).cloned();
        match row {
            Some(record) => {
                trace!(kind = T::KIND, %id, "Row locked");
                self.held.push(guard);
                Ok(record)
            }
            None => Err(T::not_found(id)),
        }
    }

    async fn persist(&mut self, record: &T) -> Result<(), StoreError> {
        self.pending.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if !self.pending.is_empty() {
            let mut rows = self.store.shared.rows.write().await;
            for record in self.pending {
                rows.insert(record.id().clone(), record);
                self.store.shared.stats.wrote();
            }
        }
        drop(self.held);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl<T: Record> StoreAdapter<T> for MemoryStore<T> {
    type Tx = MemoryTx<T>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(MemoryTx {
            store: self.clone(),
            held: Vec::new(),
            pending: Vec::new(),
        })
    }

    async fn fetch(&self, id: &T::Id) -> Result<T, StoreError> {
        self.shared.stats.read();
        self.shared
            .rows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| T::not_found(id))
    }

    async fn insert(&self, record: &T) -> Result<(), StoreError> {
        let mut rows = self.shared.rows.write().await;
        if rows.contains_key(record.id()) {
            return Err(StoreError::ConstraintViolation(format!(
                "duplicate {} id {}",
                T::KIND,
                record.id()
            )));
        }
        rows.insert(record.id().clone(), record.clone());
        self.shared.stats.wrote();
        Ok(())
    }

    async fn delete(&self, id: &T::Id) -> Result<(), StoreError> {
        let lock = self.row_lock(id)?;
        let _guard = lock.lock().await;
        let removed = self.shared.rows.write().await.remove(id);
        match removed {
            Some(_) => {
                self.shared.stats.wrote();
                Ok(())
            }
            None => Err(T::not_found(id)),
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.shared.stats.read();
        Ok(self.shared.rows.read().await.len() as u64)
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<T>, StoreError> {
        self.shared.stats.read();
        let mut rows: Vec<T> = self.shared.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| a.compare_by(b, pagination.sort_by));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(pagination.limit()).unwrap_or(usize::MAX))
            .collect())
    }
}
