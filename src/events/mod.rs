//! Order lifecycle events.
//!
//! The coordinator publishes one [`OrderEvent`] per committed create, update and delete.
//! Delivery is best effort: a failed publish is logged and never undoes the order
//! operation that triggered it.

mod bus;
mod event;

pub use bus::{BroadcastBus, LogPublisher};
pub use event::{Envelope, OrderEvent, Topic};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publisher closed")]
    Closed,
}

/// Outbound event sink.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: Topic, event: &OrderEvent) -> Result<(), PublishError>;
}
