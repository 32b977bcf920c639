//! # ActorClient Trait
//!
//! Provides a common interface for resource-specific clients, adding default `get`,
//! `delete` and `list` methods built on top of a generic `ResourceClient`.
use crate::pagination::{Page, Pagination};
use crate::{FrameworkError, Resource, ResourceClient};
use async_trait::async_trait;

/// Trait for resource-specific clients to inherit standard operations.
///
/// A wrapper only has to expose its inner [`ResourceClient`]:
///
/// ```ignore
/// struct CategoryClient {
///     inner: ResourceClient<Category>,
/// }
///
/// impl ActorClient<Category> for CategoryClient {
///     fn inner(&self) -> &ResourceClient<Category> {
///         &self.inner
///     }
/// }
///
/// // get(), delete() and list() come for free
/// let category = client.get(id).await?;
/// ```
#[async_trait]
pub trait ActorClient<T: Resource>: Send + Sync {
    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Fetch an entity by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<T, FrameworkError> {
        tracing::debug!("Sending request");
        self.inner().get(id).await
    }

    /// Delete an entity by ID, returning its last state.
    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: T::Id) -> Result<T, FrameworkError> {
        tracing::debug!("Sending request");
        self.inner().delete(id).await
    }

    /// Fetch one page of entities.
    #[tracing::instrument(skip(self))]
    async fn list(&self, pagination: Pagination) -> Result<Page<T>, FrameworkError> {
        tracing::debug!("Sending request");
        self.inner().list(pagination).await
    }
}
