//! Item and category operations, including stock reservation.

use super::error::{category_error, item_error, InventoryError};
use crate::clock::Clock;
use crate::model::{
    Category, CategoryCreate, CategoryId, CategoryUpdate, InventoryItem, ItemCreate, ItemId,
    ItemUpdate,
};
use stockroom_framework::{Mutation, Page, Pagination, Repository, StoreError};
use tracing::{debug, info, instrument};

/// The inventory service.
///
/// Generic over its repositories so the same logic runs against the cached Postgres
/// tables in production and bare in-memory tables in tests.
pub struct InventoryService<I, C> {
    items: I,
    categories: C,
    clock: Clock,
}

impl<I, C> InventoryService<I, C>
where
    I: Repository<InventoryItem>,
    C: Repository<Category>,
{
    pub fn new(items: I, categories: C, clock: Clock) -> Self {
        Self {
            items,
            categories,
            clock,
        }
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn create_item(&self, params: ItemCreate) -> Result<InventoryItem, InventoryError> {
        debug!(?params, "create_item called");
        validate_item(&params)?;

        self.categories
            .get(&params.category_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => InventoryError::UnknownCategory(params.category_id),
                other => other.into(),
            })?;

        let now = (self.clock)();
        let item = InventoryItem {
            id: ItemId::new(),
            name: params.name,
            description: params.description,
            category_id: params.category_id,
            price: params.price,
            quantity: params.quantity,
            unit: params.unit,
            created_at: now,
            updated_at: now,
        };
        self.items.save(&item).await?;
        info!(id = %item.id, "Item created");
        Ok(item)
    }

    pub async fn get_item(&self, id: ItemId) -> Result<InventoryItem, InventoryError> {
        self.items.get(&id).await.map_err(item_error(id))
    }

    pub async fn list_items(
        &self,
        pagination: Pagination,
    ) -> Result<Page<InventoryItem>, InventoryError> {
        let total = self.items.count().await?;
        let data = self.items.list(&pagination).await?;
        Ok(Page::new(&pagination, total, data))
    }

    /// Applies the fields of `update` that differ from the stored item.
    ///
    /// Fails with `NotUpdated` when every given field already holds the requested value.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<InventoryItem, InventoryError> {
        if update.is_empty() {
            return Err(InventoryError::InvalidArgument(
                "at least one field must be provided".into(),
            ));
        }
        require_non_empty("name", update.name.as_deref())?;
        require_non_empty("description", update.description.as_deref())?;
        require_non_empty("unit", update.unit.as_deref())?;

        if let Some(category_id) = update.category_id {
            self.categories
                .get(&category_id)
                .await
                .map_err(category_error(category_id))?;
        }

        let now = (self.clock)();
        let outcome = self
            .items
            .update_by_id(&id, |item| apply_item_update(item, update, now))
            .await
            .map_err(|err| err.for_item(id))?;
        let item = outcome.require_change()?;
        info!(%id, "Item updated");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: ItemId) -> Result<InventoryItem, InventoryError> {
        let item = self.items.get(&id).await.map_err(item_error(id))?;
        self.items.delete_by_id(&id).await.map_err(item_error(id))?;
        info!(%id, "Item deleted");
        Ok(item)
    }

    /// Takes `quantity` units out of stock.
    ///
    /// The check and the decrement happen under the item's row lock, so concurrent
    /// reservations can never drive the quantity below zero. Reserving zero units is
    /// accepted and still stamps `updated_at`.
    #[instrument(skip(self))]
    pub async fn reserve(&self, id: ItemId, quantity: i64) -> Result<InventoryItem, InventoryError> {
        let now = (self.clock)();
        let outcome = self
            .items
            .update_by_id(&id, |item| {
                if quantity < 0 {
                    return Mutation::Rejected(InventoryError::InvalidQuantity(quantity as f64));
                }
                // NaN stock fails this comparison too.
                let fits = quantity as f64 <= item.quantity;
                if !fits {
                    return Mutation::Rejected(InventoryError::InsufficientQuantity {
                        requested: quantity,
                        available: item.quantity,
                    });
                }
                let mut next = item.clone();
                next.quantity -= quantity as f64;
                next.updated_at = now;
                Mutation::Changed(next)
            })
            .await
            .map_err(|err| err.for_item(id))?;

        let item = outcome.into_inner();
        info!(%id, quantity, remaining = item.quantity, "Stock reserved");
        Ok(item)
    }

    // ---------------------------------------------------------------------
    // Categories
    // ---------------------------------------------------------------------

    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn create_category(
        &self,
        params: CategoryCreate,
    ) -> Result<Category, InventoryError> {
        require_non_empty("name", Some(params.name.as_str()))?;
        require_non_empty("description", Some(params.description.as_str()))?;

        let now = (self.clock)();
        let category = Category {
            id: CategoryId::new(),
            name: params.name,
            description: params.description,
            created_at: now,
            updated_at: now,
        };
        self.categories.save(&category).await?;
        info!(id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, InventoryError> {
        self.categories.get(&id).await.map_err(category_error(id))
    }

    pub async fn list_categories(
        &self,
        pagination: Pagination,
    ) -> Result<Page<Category>, InventoryError> {
        let total = self.categories.count().await?;
        let data = self.categories.list(&pagination).await?;
        Ok(Page::new(&pagination, total, data))
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        update: CategoryUpdate,
    ) -> Result<Category, InventoryError> {
        if update.name.is_none() && update.description.is_none() {
            return Err(InventoryError::InvalidArgument(
                "at least one field must be provided".into(),
            ));
        }
        require_non_empty("name", update.name.as_deref())?;
        require_non_empty("description", update.description.as_deref())?;

        let now = (self.clock)();
        let outcome = self
            .categories
            .update_by_id(&id, |category| {
                let mut next = category.clone();
                let mut changed = false;
                if let Some(name) = update.name.filter(|n| *n != category.name) {
                    next.name = name;
                    changed = true;
                }
                if let Some(description) =
                    update.description.filter(|d| *d != category.description)
                {
                    next.description = description;
                    changed = true;
                }
                if changed {
                    next.updated_at = now;
                }
                Mutation::<_, InventoryError>::changed_if(changed, next)
            })
            .await
            .map_err(|err| err.for_category(id))?;
        let category = outcome.require_change()?;
        info!(%id, "Category updated");
        Ok(category)
    }

    /// Fails with a constraint violation while items still reference the category
    /// (enforced by the Postgres schema).
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<Category, InventoryError> {
        let category = self.categories.get(&id).await.map_err(category_error(id))?;
        self.categories
            .delete_by_id(&id)
            .await
            .map_err(category_error(id))?;
        info!(%id, "Category deleted");
        Ok(category)
    }
}

impl InventoryError {
    fn for_item(self, id: ItemId) -> Self {
        match self {
            InventoryError::Store(StoreError::NotFound { .. }) => InventoryError::ItemNotFound(id),
            other => other,
        }
    }

    fn for_category(self, id: CategoryId) -> Self {
        match self {
            InventoryError::Store(StoreError::NotFound { .. }) => {
                InventoryError::CategoryNotFound(id)
            }
            other => other,
        }
    }
}

/// Finite and at least zero. NaN and the infinities fail.
fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn validate_item(params: &ItemCreate) -> Result<(), InventoryError> {
    if !is_valid_amount(params.quantity) {
        return Err(InventoryError::InvalidQuantity(params.quantity));
    }
    if !is_valid_amount(params.price) {
        return Err(InventoryError::InvalidPrice(params.price));
    }
    require_non_empty("name", Some(params.name.as_str()))?;
    require_non_empty("description", Some(params.description.as_str()))?;
    require_non_empty("unit", Some(params.unit.as_str()))
}

fn require_non_empty(field: &str, value: Option<&str>) -> Result<(), InventoryError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(InventoryError::InvalidArgument(format!(
            "{field} cannot be empty"
        ))),
        _ => Ok(()),
    }
}

fn apply_item_update(
    item: &InventoryItem,
    update: ItemUpdate,
    now: chrono::DateTime<chrono::Utc>,
) -> Mutation<InventoryItem, InventoryError> {
    let mut next = item.clone();
    let mut changed = false;

    if let Some(name) = update.name.filter(|v| *v != item.name) {
        next.name = name;
        changed = true;
    }
    if let Some(description) = update.description.filter(|v| *v != item.description) {
        next.description = description;
        changed = true;
    }
    if let Some(category_id) = update.category_id.filter(|v| *v != item.category_id) {
        next.category_id = category_id;
        changed = true;
    }
    if let Some(price) = update.price.filter(|v| *v != item.price) {
        if !is_valid_amount(price) {
            return Mutation::Rejected(InventoryError::InvalidPrice(price));
        }
        next.price = price;
        changed = true;
    }
    if let Some(quantity) = update.quantity.filter(|v| *v != item.quantity) {
        if !is_valid_amount(quantity) {
            return Mutation::Rejected(InventoryError::InvalidQuantity(quantity));
        }
        next.quantity = quantity;
        changed = true;
    }
    if let Some(unit) = update.unit.filter(|v| *v != item.unit) {
        next.unit = unit;
        changed = true;
    }

    if changed {
        next.updated_at = now;
    }
    Mutation::changed_if(changed, next)
}
