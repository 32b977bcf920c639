//! Wiring: stores, caches, services, actors and clients.

mod system;
pub mod tracing;

pub use system::{MemoryBackends, StockSystem, SystemError};
