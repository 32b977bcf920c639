//! # Order Client
//!
//! Provides a high-level API for interacting with the order actor. Placement logic
//! (product lookups, reservations, events) runs on the server side in the
//! [`OrderCoordinator`](crate::orders::OrderCoordinator).
use crate::model::{Order, OrderCreate, OrderId, OrderUpdate};
use stockroom_framework::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, info, instrument};

/// Client for interacting with the order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, params), fields(user_id = %params.user_id, lines = params.items.len()))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<Order, FrameworkError> {
        debug!(?params, "create_order called");
        info!("Sending create_order to actor");
        self.inner.create(params).await
    }

    #[instrument(skip(self))]
    pub async fn update_order(
        &self,
        id: OrderId,
        update: OrderUpdate,
    ) -> Result<Order, FrameworkError> {
        debug!("Sending request");
        self.inner.update(id, update).await
    }
}

impl ActorClient<Order> for OrderClient {
    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }
}
