use super::{CategoryId, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use stockroom_framework::{Record, Resource, SortOption};

/// A stock-keeping unit with its on-hand quantity.
///
/// `quantity` is fractional so that items sold by weight or length share one model;
/// reservations are always whole units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub price: f64,
    pub quantity: f64,
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for InventoryItem {
    type Id = ItemId;
    const KIND: &'static str = "item";

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn compare_by(&self, other: &Self, sort: Option<SortOption>) -> Ordering {
        match sort {
            Some(SortOption::Price) => self.price.total_cmp(&other.price),
            Some(SortOption::Quantity) => self.quantity.total_cmp(&other.quantity),
            Some(SortOption::Name) => self.name.cmp(&other.name),
            Some(SortOption::CreatedAt) => self.created_at.cmp(&other.created_at),
            Some(SortOption::UpdatedAt) => self.updated_at.cmp(&other.updated_at),
            Some(SortOption::Id) | None => self.id.cmp(&other.id),
        }
    }
}

impl Resource for InventoryItem {
    type Create = ItemCreate;
    type Update = ItemUpdate;
    type Action = ItemAction;
    type ActionResult = ItemActionResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCreate {
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub price: f64,
    pub quantity: f64,
    pub unit: String,
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    /// Decrement the on-hand quantity by this many units.
    Reserve(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemActionResult {
    Reserved { remaining: f64 },
}
