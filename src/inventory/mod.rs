//! The inventory service: items, categories and stock reservation.

mod error;
mod handler;
mod service;

pub use error::InventoryError;
pub use service::InventoryService;
