use super::{ItemId, OrderId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use stockroom_framework::{Code, Record, Resource, SortOption, Status, ToStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl ToStatus for UnknownStatus {
    fn to_status(&self) -> Status {
        Status::new(Code::InvalidArgument, self.to_string())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One order line, with product name and price as they were when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ItemId,
    pub product_name: String,
    pub product_price: f64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.product_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_name: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Order {
    type Id = OrderId;
    const KIND: &'static str = "order";

    fn id(&self) -> &OrderId {
        &self.id
    }

    /// Newest first unless a column is requested.
    fn compare_by(&self, other: &Self, sort: Option<SortOption>) -> Ordering {
        match sort {
            Some(SortOption::Id) => self.id.cmp(&other.id),
            Some(SortOption::Price) => self.total_amount.total_cmp(&other.total_amount),
            Some(SortOption::Name) => self.user_name.cmp(&other.user_name),
            Some(SortOption::UpdatedAt) => self.updated_at.cmp(&other.updated_at),
            Some(SortOption::CreatedAt) => self.created_at.cmp(&other.created_at),
            Some(SortOption::Quantity) | None => other.created_at.cmp(&self.created_at),
        }
    }
}

impl Resource for Order {
    type Create = OrderCreate;
    type Update = OrderUpdate;
    type Action = OrderAction;
    type ActionResult = ();
}

/// A requested line: which item and how many units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreate {
    pub user_id: UserId,
    pub user_name: String,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub user_name: Option<String>,
    pub status: Option<OrderStatus>,
}

/// Orders have no operations beyond CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_status().code, Code::InvalidArgument);
        assert_eq!(err.to_string(), "unknown order status: shipped");
    }

    #[test]
    fn subtotal_is_price_times_quantity() {
        let line = OrderItem {
            product_id: ItemId::new(),
            product_name: "bolt".into(),
            product_price: 0.25,
            quantity: 8,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(line.subtotal(), 2.0);
    }
}
