use super::{OrderCoordinator, OrderError};
use crate::model::{Order, OrderAction, OrderCreate, OrderId, OrderUpdate};
use async_trait::async_trait;
use stockroom_framework::{Page, Pagination, Repository, ResourceHandler};

#[async_trait]
impl<R> ResourceHandler<Order> for OrderCoordinator<R>
where
    R: Repository<Order> + 'static,
{
    type Error = OrderError;

    async fn create(&self, params: OrderCreate) -> Result<Order, OrderError> {
        self.create_order(params).await
    }

    async fn get(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.get_order(*id).await
    }

    async fn update(&self, id: &OrderId, update: OrderUpdate) -> Result<Order, OrderError> {
        self.update_order(*id, update).await
    }

    async fn delete(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.delete_order(*id).await
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<Order>, OrderError> {
        self.list_orders(pagination).await
    }

    async fn handle_action(&self, _id: &OrderId, action: OrderAction) -> Result<(), OrderError> {
        match action {}
    }
}
