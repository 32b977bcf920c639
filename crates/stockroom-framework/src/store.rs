//! # Store Adapters and the Update Engine
//!
//! A [`StoreAdapter`] is the thin, per-aggregate layer over a backend: plain reads and
//! writes plus a [`Transaction`] that can take an exclusive row lock. The [`Repository`]
//! trait is what services depend on. [`Table`] turns any adapter into a repository and
//! owns the one mutation primitive, `update_by_id`:
//!
//! 1. begin a transaction and `fetch_for_update` the row (missing -> `NotFound`);
//! 2. run the caller's pure mutation on the locked record;
//! 3. `Rejected(e)` rolls back and returns `e` untouched;
//! 4. `Unchanged` commits without writing;
//! 5. `Changed(next)` persists `next` and commits.
//!
//! The row lock is held from step 1 until commit or rollback, so concurrent mutations of
//! the same identity are serialised while different identities proceed in parallel.

use crate::entity::Record;
use crate::error::StoreError;
use crate::mutation::{Mutation, Outcome};
use crate::pagination::Pagination;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// A unit of work holding zero or more row locks.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit) discards its
/// pending writes and releases its locks.
#[async_trait]
pub trait Transaction<T: Record>: Send {
    /// Reads a row and locks it until the transaction ends.
    async fn fetch_for_update(&mut self, id: &T::Id) -> Result<T, StoreError>;

    /// Writes a record previously locked by this transaction.
    async fn persist(&mut self, record: &T) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Backend operations for one aggregate type.
#[async_trait]
pub trait StoreAdapter<T: Record>: Send + Sync {
    type Tx: Transaction<T>;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn fetch(&self, id: &T::Id) -> Result<T, StoreError>;

    /// Fails with `ConstraintViolation` on a duplicate id or a dangling reference.
    async fn insert(&self, record: &T) -> Result<(), StoreError>;

    async fn delete(&self, id: &T::Id) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn list(&self, pagination: &Pagination) -> Result<Vec<T>, StoreError>;
}

/// The repository port used by domain services.
///
/// Implemented by [`Table`] (any store adapter), by
/// [`ReadThroughCache`](crate::cache::ReadThroughCache) and by `Arc<R>`.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn get(&self, id: &T::Id) -> Result<T, StoreError>;

    async fn save(&self, record: &T) -> Result<(), StoreError>;

    /// Locks the row, applies `mutate` and persists the result if it changed.
    ///
    /// Domain errors returned through [`Mutation::Rejected`] come back as-is; store
    /// failures are converted with `E::from`.
    async fn update_by_id<F, E>(&self, id: &T::Id, mutate: F) -> Result<Outcome<T>, E>
    where
        F: FnOnce(&T) -> Mutation<T, E> + Send,
        E: From<StoreError> + Send;

    async fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn list(&self, pagination: &Pagination) -> Result<Vec<T>, StoreError>;
}

/// A [`Repository`] backed directly by a [`StoreAdapter`].
#[derive(Debug, Clone)]
pub struct Table<A> {
    adapter: A,
}

impl<A> Table<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<T, A> Repository<T> for Table<A>
where
    T: Record,
    A: StoreAdapter<T>,
{
    async fn get(&self, id: &T::Id) -> Result<T, StoreError> {
        self.adapter.fetch(id).await
    }

    async fn save(&self, record: &T) -> Result<(), StoreError> {
        self.adapter.insert(record).await
    }

    async fn update_by_id<F, E>(&self, id: &T::Id, mutate: F) -> Result<Outcome<T>, E>
    where
        F: FnOnce(&T) -> Mutation<T, E> + Send,
        E: From<StoreError> + Send,
    {
        let kind = T::KIND;
        let mut tx = self.adapter.begin().await?;

        let current = match tx.fetch_for_update(id).await {
            Ok(record) => record,
            Err(err) => {
                discard::<T, _>(tx).await;
                return Err(err.into());
            }
        };

        match mutate(&current) {
            Mutation::Rejected(err) => {
                debug!(kind, %id, "Mutation rejected");
                discard::<T, _>(tx).await;
                Err(err)
            }
            Mutation::Unchanged => {
                tx.commit().await?;
                debug!(kind, %id, "Unchanged");
                Ok(Outcome::Unchanged(current))
            }
            Mutation::Changed(next) => {
                if let Err(err) = tx.persist(&next).await {
                    discard::<T, _>(tx).await;
                    return Err(err.into());
                }
                tx.commit().await?;
                debug!(kind, %id, "Persisted");
                Ok(Outcome::Updated(next))
            }
        }
    }

    async fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError> {
        self.adapter.delete(id).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.adapter.count().await
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<T>, StoreError> {
        self.adapter.list(pagination).await
    }
}

async fn discard<T: Record, X: Transaction<T>>(tx: X) {
    if let Err(err) = tx.rollback().await {
        warn!(kind = T::KIND, error = %err, "Rollback failed");
    }
}

#[async_trait]
impl<T, R> Repository<T> for Arc<R>
where
    T: Record,
    R: Repository<T>,
{
    async fn get(&self, id: &T::Id) -> Result<T, StoreError> {
        <R as Repository<T>>::get(&**self, id).await
    }

    async fn save(&self, record: &T) -> Result<(), StoreError> {
        <R as Repository<T>>::save(&**self, record).await
    }

    async fn update_by_id<F, E>(&self, id: &T::Id, mutate: F) -> Result<Outcome<T>, E>
    where
        F: FnOnce(&T) -> Mutation<T, E> + Send,
        E: From<StoreError> + Send,
    {
        <R as Repository<T>>::update_by_id(&**self, id, mutate).await
    }

    async fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError> {
        <R as Repository<T>>::delete_by_id(&**self, id).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        <R as Repository<T>>::count(&**self).await
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<T>, StoreError> {
        <R as Repository<T>>::list(&**self, pagination).await
    }
}
