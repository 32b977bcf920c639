use crate::model::{ItemId, OrderId, OrderStatus, UnknownStatus};
use stockroom_framework::{Code, FrameworkError, Status, StoreError, ToStatus};
use thiserror::Error;

/// Errors raised by order placement and order maintenance.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid quantity {quantity} for item {product_id}")]
    InvalidQuantity { product_id: ItemId, quantity: i64 },

    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("insufficient quantity for item {product_id}: requested {requested}, available {available}")]
    InsufficientQuantity {
        product_id: ItemId,
        requested: i64,
        available: f64,
    },

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("status transition {from} -> {to} rejected")]
    TransitionRejected { from: OrderStatus, to: OrderStatus },

    #[error("nothing to update")]
    NotUpdated,

    /// A remote call failed for a reason other than a missing product.
    #[error("inventory call failed: {0}")]
    Remote(#[from] FrameworkError),

    #[error(transparent)]
    Store(StoreError),
}

impl OrderError {
    pub fn code(&self) -> Code {
        match self {
            OrderError::InvalidRequest(_)
            | OrderError::InvalidQuantity { .. }
            | OrderError::TransitionRejected { .. } => Code::InvalidArgument,
            OrderError::ItemNotFound(_) | OrderError::OrderNotFound(_) => Code::NotFound,
            OrderError::InsufficientQuantity { .. } => Code::InsufficientQuantity,
            OrderError::NotUpdated => Code::NotUpdated,
            OrderError::Remote(err) => err.code(),
            OrderError::Store(err) => err.code(),
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotUpdated => OrderError::NotUpdated,
            other => OrderError::Store(other),
        }
    }
}

/// A status name supplied by a caller that does not match any status.
impl From<UnknownStatus> for OrderError {
    fn from(err: UnknownStatus) -> Self {
        OrderError::InvalidRequest(err.to_string())
    }
}

impl ToStatus for OrderError {
    fn to_status(&self) -> Status {
        match self {
            // The remote side already produced a wire status; pass it on as is.
            OrderError::Remote(err) => err.to_status(),
            OrderError::Store(err) => err.to_status(),
            other => Status::new(other.code(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_codes_pass_through() {
        let remote = FrameworkError::from(Status::new(Code::InsufficientQuantity, "only 1 left"));
        let err = OrderError::from(remote);
        assert_eq!(err.code(), Code::InsufficientQuantity);
        assert_eq!(err.to_status().message, "only 1 left");

        let unavailable = OrderError::from(FrameworkError::ActorClosed);
        assert_eq!(unavailable.code(), Code::Unavailable);
    }

    #[test]
    fn unknown_status_name_is_invalid_argument() {
        let err: OrderError = "shipped".parse::<OrderStatus>().unwrap_err().into();
        assert!(matches!(err, OrderError::InvalidRequest(ref msg) if msg.contains("shipped")));
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.to_status().code, Code::InvalidArgument);
    }

    #[test]
    fn validation_errors_are_invalid_argument() {
        assert_eq!(
            OrderError::InvalidRequest("no items".into()).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            OrderError::InvalidQuantity {
                product_id: ItemId::new(),
                quantity: 0
            }
            .code(),
            Code::InvalidArgument
        );
    }
}
