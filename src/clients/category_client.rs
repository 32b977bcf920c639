//! # Category Client
use crate::model::{Category, CategoryCreate, CategoryId, CategoryUpdate};
use stockroom_framework::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, instrument};

/// Client for interacting with the category actor.
#[derive(Clone)]
pub struct CategoryClient {
    inner: ResourceClient<Category>,
}

impl CategoryClient {
    pub fn new(inner: ResourceClient<Category>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, params: CategoryCreate) -> Result<Category, FrameworkError> {
        debug!("Sending request");
        self.inner.create(params).await
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        update: CategoryUpdate,
    ) -> Result<Category, FrameworkError> {
        debug!("Sending request");
        self.inner.update(id, update).await
    }
}

impl ActorClient<Category> for CategoryClient {
    fn inner(&self) -> &ResourceClient<Category> {
        &self.inner
    }
}
