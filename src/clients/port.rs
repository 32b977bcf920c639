//! The order side's view of the inventory service.

use crate::model::{InventoryItem, ItemId};
use async_trait::async_trait;
use stockroom_framework::FrameworkError;

/// What the coordinator needs to know about a product at order time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: ItemId,
    pub name: String,
    pub price: f64,
    pub quantity: f64,
}

impl From<InventoryItem> for ProductSnapshot {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// Remote inventory operations used during order placement.
///
/// Errors keep the remote status code, so callers can tell a missing product from an
/// unreachable service.
#[async_trait]
pub trait InventoryPort: Send + Sync {
    async fn get_product(&self, id: ItemId) -> Result<ProductSnapshot, FrameworkError>;

    /// Reserves `quantity` units and returns what is left on hand.
    async fn reserve_item(&self, id: ItemId, quantity: i64) -> Result<f64, FrameworkError>;
}
