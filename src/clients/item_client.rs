//! # Item Client
//!
//! Provides a high-level API for interacting with the inventory item actor.
use super::port::{InventoryPort, ProductSnapshot};
use crate::model::{InventoryItem, ItemAction, ItemActionResult, ItemCreate, ItemId, ItemUpdate};
use async_trait::async_trait;
use stockroom_framework::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, instrument};

/// Client for interacting with the inventory item actor.
#[derive(Clone)]
pub struct ItemClient {
    inner: ResourceClient<InventoryItem>,
}

impl ItemClient {
    pub fn new(inner: ResourceClient<InventoryItem>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn create_item(&self, params: ItemCreate) -> Result<InventoryItem, FrameworkError> {
        debug!(?params, "Sending request");
        self.inner.create(params).await
    }

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<InventoryItem, FrameworkError> {
        debug!("Sending request");
        self.inner.update(id, update).await
    }

    /// Reserve units of an item; returns the quantity left on hand.
    #[instrument(skip(self))]
    pub async fn reserve(&self, id: ItemId, quantity: i64) -> Result<f64, FrameworkError> {
        debug!("Sending request");
        match self
            .inner
            .perform_action(id, ItemAction::Reserve(quantity))
            .await?
        {
            ItemActionResult::Reserved { remaining } => Ok(remaining),
        }
    }
}

impl ActorClient<InventoryItem> for ItemClient {
    fn inner(&self) -> &ResourceClient<InventoryItem> {
        &self.inner
    }
}

#[async_trait]
impl InventoryPort for ItemClient {
    async fn get_product(&self, id: ItemId) -> Result<ProductSnapshot, FrameworkError> {
        ActorClient::get(self, id).await.map(ProductSnapshot::from)
    }

    async fn reserve_item(&self, id: ItemId, quantity: i64) -> Result<f64, FrameworkError> {
        self.reserve(id, quantity).await
    }
}
