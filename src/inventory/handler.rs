//! Inbound surface of the inventory service: one [`ResourceHandler`] per resource.

use super::{InventoryError, InventoryService};
use crate::model::{
    Category, CategoryAction, CategoryCreate, CategoryId, CategoryUpdate, InventoryItem,
    ItemAction, ItemActionResult, ItemCreate, ItemId, ItemUpdate,
};
use async_trait::async_trait;
use stockroom_framework::{Page, Pagination, Repository, ResourceHandler};

#[async_trait]
impl<I, C> ResourceHandler<InventoryItem> for InventoryService<I, C>
where
    I: Repository<InventoryItem> + 'static,
    C: Repository<Category> + 'static,
{
    type Error = InventoryError;

    async fn create(&self, params: ItemCreate) -> Result<InventoryItem, InventoryError> {
        self.create_item(params).await
    }

    async fn get(&self, id: &ItemId) -> Result<InventoryItem, InventoryError> {
        self.get_item(*id).await
    }

    async fn update(&self, id: &ItemId, update: ItemUpdate) -> Result<InventoryItem, InventoryError> {
        self.update_item(*id, update).await
    }

    async fn delete(&self, id: &ItemId) -> Result<InventoryItem, InventoryError> {
        self.delete_item(*id).await
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<InventoryItem>, InventoryError> {
        self.list_items(pagination).await
    }

    async fn handle_action(
        &self,
        id: &ItemId,
        action: ItemAction,
    ) -> Result<ItemActionResult, InventoryError> {
        match action {
            ItemAction::Reserve(quantity) => {
                let item = self.reserve(*id, quantity).await?;
                Ok(ItemActionResult::Reserved {
                    remaining: item.quantity,
                })
            }
        }
    }
}

#[async_trait]
impl<I, C> ResourceHandler<Category> for InventoryService<I, C>
where
    I: Repository<InventoryItem> + 'static,
    C: Repository<Category> + 'static,
{
    type Error = InventoryError;

    async fn create(&self, params: CategoryCreate) -> Result<Category, InventoryError> {
        self.create_category(params).await
    }

    async fn get(&self, id: &CategoryId) -> Result<Category, InventoryError> {
        self.get_category(*id).await
    }

    async fn update(
        &self,
        id: &CategoryId,
        update: CategoryUpdate,
    ) -> Result<Category, InventoryError> {
        self.update_category(*id, update).await
    }

    async fn delete(&self, id: &CategoryId) -> Result<Category, InventoryError> {
        self.delete_category(*id).await
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<Category>, InventoryError> {
        self.list_categories(pagination).await
    }

    async fn handle_action(
        &self,
        _id: &CategoryId,
        action: CategoryAction,
    ) -> Result<(), InventoryError> {
        match action {}
    }
}
