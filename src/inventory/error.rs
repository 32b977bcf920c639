use crate::model::{CategoryId, ItemId};
use stockroom_framework::{Code, Status, StoreError, ToStatus};
use thiserror::Error;

/// Errors raised by the inventory service.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// The category named on create does not exist.
    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(f64),

    #[error("invalid price: {0}")]
    InvalidPrice(f64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: i64, available: f64 },

    #[error("nothing to update")]
    NotUpdated,

    #[error(transparent)]
    Store(StoreError),
}

impl InventoryError {
    pub fn code(&self) -> Code {
        match self {
            InventoryError::ItemNotFound(_) | InventoryError::CategoryNotFound(_) => Code::NotFound,
            InventoryError::InvalidQuantity(_)
            | InventoryError::InvalidPrice(_)
            | InventoryError::InvalidArgument(_) => Code::InvalidArgument,
            InventoryError::InsufficientQuantity { .. } => Code::InsufficientQuantity,
            InventoryError::UnknownCategory(_) => Code::ConstraintViolation,
            InventoryError::NotUpdated => Code::NotUpdated,
            InventoryError::Store(err) => err.code(),
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotUpdated => InventoryError::NotUpdated,
            other => InventoryError::Store(other),
        }
    }
}

impl ToStatus for InventoryError {
    fn to_status(&self) -> Status {
        match self {
            InventoryError::Store(err) => err.to_status(),
            other => Status::new(other.code(), other.to_string()),
        }
    }
}

/// Maps a store miss on an item to `ItemNotFound`, leaving other errors as they are.
pub(crate) fn item_error(id: ItemId) -> impl FnOnce(StoreError) -> InventoryError {
    move |err| match err {
        StoreError::NotFound { .. } => InventoryError::ItemNotFound(id),
        other => other.into(),
    }
}

pub(crate) fn category_error(id: CategoryId) -> impl FnOnce(StoreError) -> InventoryError {
    move |err| match err {
        StoreError::NotFound { .. } => InventoryError::CategoryNotFound(id),
        other => other.into(),
    }
}
