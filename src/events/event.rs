use crate::model::{Order, OrderId, OrderStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subject an event is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "orders.created")]
    OrdersCreated,
    #[serde(rename = "orders.updated")]
    OrdersUpdated,
    #[serde(rename = "orders.deleted")]
    OrdersDeleted,
}

impl Topic {
    pub fn subject(&self) -> &'static str {
        match self {
            Topic::OrdersCreated => "orders.created",
            Topic::OrdersUpdated => "orders.updated",
            Topic::OrdersDeleted => "orders.deleted",
        }
    }

    /// The `operation` field carried by events on this topic.
    pub fn operation(&self) -> &'static str {
        match self {
            Topic::OrdersCreated => "created",
            Topic::OrdersUpdated => "updated",
            Topic::OrdersDeleted => "deleted",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subject())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub operation: String,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(topic: Topic, order: &Order) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            operation: topic.operation().to_string(),
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
            total: order.total_amount,
            created_at: order.created_at,
        }
    }
}

/// An encoded event as it travels on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: Topic,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn encode(topic: Topic, event: &OrderEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic,
            payload: serde_json::to_vec(event)?,
        })
    }

    pub fn decode(&self) -> Result<OrderEvent, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
