//! Mutation results for the read-lock-mutate-persist cycle.

use crate::error::StoreError;

/// What a mutation function decided to do with the locked record.
///
/// Mutations are pure: they receive the current record and return a new one, so the
/// engine alone decides whether a write happens.
#[derive(Debug)]
pub enum Mutation<T, E> {
    /// The record changed; persist this value.
    Changed(T),
    /// Nothing differs from the stored record; no write is issued.
    Unchanged,
    /// A domain rule rejected the mutation; the transaction is rolled back.
    Rejected(E),
}

impl<T, E> Mutation<T, E> {
    /// `Changed(next)` when `changed` is true, `Unchanged` otherwise.
    pub fn changed_if(changed: bool, next: T) -> Self {
        if changed {
            Mutation::Changed(next)
        } else {
            Mutation::Unchanged
        }
    }
}

/// Result of a successful `update_by_id`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// A write was issued; holds the persisted record.
    Updated(T),
    /// No write was issued; holds the record as read under the lock.
    Unchanged(T),
}

impl<T> Outcome<T> {
    pub fn is_updated(&self) -> bool {
        matches!(self, Outcome::Updated(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Updated(record) | Outcome::Unchanged(record) => record,
        }
    }

    /// For update APIs that must change something: `Unchanged` becomes `NotUpdated`.
    pub fn require_change(self) -> Result<T, StoreError> {
        match self {
            Outcome::Updated(record) => Ok(record),
            Outcome::Unchanged(_) => Err(StoreError::NotUpdated),
        }
    }
}
