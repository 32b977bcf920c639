//! # Records and Resources
//!
//! Two traits describe what the framework manages:
//!
//! - [`Record`] is anything a store can hold: it has an identity, a kind name used in
//!   error messages, and knows how to order itself for listings.
//! - [`Resource`] extends a record with the payload types of its request surface
//!   (create, update, custom action). A `ResourceClient<T>` and a `ResourceActor<T>` are
//!   generic over it, so a client for items can never send a category payload.
//!
//! The behaviour behind a resource lives in a [`ResourceHandler`], usually a domain
//! service. One service may serve several resources by implementing the trait once per
//! resource type.

use crate::error::{StoreError, ToStatus};
use crate::pagination::{Page, Pagination, SortOption};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A row-like value that can be stored, locked and cached by identity.
pub trait Record: Clone + Debug + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static;

    /// Human readable kind, e.g. `"item"`, used in not-found messages.
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;

    /// Ordering for listings. `None` selects the record's default order.
    fn compare_by(&self, other: &Self, sort: Option<SortOption>) -> Ordering;

    fn not_found(id: &Self::Id) -> StoreError {
        StoreError::not_found(Self::KIND, id)
    }
}

/// A record with a typed request surface.
pub trait Resource: Record {
    /// Payload for creating a new instance.
    type Create: Send + Debug + 'static;

    /// Payload for updating an existing instance.
    type Update: Send + Debug + 'static;

    /// Resource-specific operations that do not fit CRUD (e.g. a stock reservation).
    type Action: Send + Debug + 'static;

    /// Result type returned by custom actions.
    type ActionResult: Send + Debug + 'static;
}

/// Server-side behaviour for a [`Resource`].
///
/// Every method receives shared access only: the actor runs each request on its own
/// task, so implementations must get their isolation from the store (row locks), not
/// from the actor loop.
#[async_trait]
pub trait ResourceHandler<T: Resource>: Send + Sync + 'static {
    /// Domain error; converted to a stable status before it crosses the channel.
    type Error: std::error::Error + ToStatus + Send + Sync + 'static;

    async fn create(&self, params: T::Create) -> Result<T, Self::Error>;

    async fn get(&self, id: &T::Id) -> Result<T, Self::Error>;

    async fn update(&self, id: &T::Id, update: T::Update) -> Result<T, Self::Error>;

    /// Removes the instance and returns its last state.
    async fn delete(&self, id: &T::Id) -> Result<T, Self::Error>;

    async fn list(&self, pagination: Pagination) -> Result<Page<T>, Self::Error>;

    async fn handle_action(
        &self,
        id: &T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, Self::Error>;
}
