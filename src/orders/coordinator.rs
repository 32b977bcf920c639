//! Order placement and maintenance.
//!
//! Placement walks the requested lines in order. For each line it checks the quantity,
//! reads the product from the inventory service and asks that service to reserve the
//! units. The first failing line aborts the placement. Only when every line is reserved
//! is the order written, as `pending`, and announced on `orders.created`.
//!
//! Reservations are not transactional across lines: if line 2 fails, line 1 stays
//! reserved. The [`Compensator`] is told about such leftovers; the default one logs
//! them. A reserve call that timed out is passed on as unconfirmed, since the
//! inventory service may still have applied it.

use super::policy::{
    AppliedReservation, Compensator, NoCompensation, PermissiveStatusPolicy, StatusPolicy,
};
use super::OrderError;
use crate::clients::{InventoryPort, ProductSnapshot};
use crate::clock::Clock;
use crate::events::{EventPublisher, OrderEvent, Topic};
use crate::model::{
    Order, OrderCreate, OrderId, OrderItem, OrderLine, OrderStatus, OrderUpdate,
};
use std::sync::Arc;
use stockroom_framework::{FrameworkError, Mutation, Page, Pagination, Repository, StoreError};
use tracing::{debug, error, info, instrument, warn};

pub struct OrderCoordinator<R> {
    orders: R,
    inventory: Arc<dyn InventoryPort>,
    publisher: Arc<dyn EventPublisher>,
    status_policy: Arc<dyn StatusPolicy>,
    compensator: Arc<dyn Compensator>,
    clock: Clock,
}

impl<R> OrderCoordinator<R>
where
    R: Repository<Order>,
{
    /// A coordinator with the permissive status policy and no compensation.
    pub fn new(
        orders: R,
        inventory: Arc<dyn InventoryPort>,
        publisher: Arc<dyn EventPublisher>,
        clock: Clock,
    ) -> Self {
        Self {
            orders,
            inventory,
            publisher,
            status_policy: Arc::new(PermissiveStatusPolicy),
            compensator: Arc::new(NoCompensation),
            clock,
        }
    }

    pub fn with_status_policy(mut self, policy: Arc<dyn StatusPolicy>) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_compensator(mut self, compensator: Arc<dyn Compensator>) -> Self {
        self.compensator = compensator;
        self
    }

    #[instrument(skip(self, params), fields(user_id = %params.user_id, lines = params.items.len()))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<Order, OrderError> {
        debug!(?params, "create_order called");
        if params.items.is_empty() {
            return Err(OrderError::InvalidRequest(
                "order must contain at least one item".into(),
            ));
        }

        let now = (self.clock)();
        let mut applied = Vec::with_capacity(params.items.len());
        let mut items = Vec::with_capacity(params.items.len());
        for line in &params.items {
            let product = match self.check_line(line).await {
                Ok(product) => product,
                Err(err) => return Err(self.abandon(&applied, line, err).await),
            };

            match self
                .inventory
                .reserve_item(line.product_id, line.quantity)
                .await
            {
                Ok(remaining) => {
                    debug!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        remaining,
                        "Line reserved"
                    );
                    applied.push(AppliedReservation::confirmed(line));
                    items.push(OrderItem {
                        product_id: line.product_id,
                        product_name: product.name,
                        product_price: product.price,
                        quantity: line.quantity,
                        created_at: now,
                        updated_at: now,
                    });
                }
                Err(err) => {
                    // The inventory side may still commit a reservation we stopped waiting for.
                    if matches!(err, FrameworkError::DeadlineExceeded(_)) {
                        applied.push(AppliedReservation::unconfirmed(line));
                    }
                    return Err(self.abandon(&applied, line, err.into()).await);
                }
            }
        }

        let order = Order {
            id: OrderId::new(),
            user_id: params.user_id,
            user_name: params.user_name,
            total_amount: items.iter().map(OrderItem::subtotal).sum(),
            status: OrderStatus::Pending,
            items,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.orders.save(&order).await {
            let err = OrderError::from(err);
            error!(order_id = %order.id, error = %err, "Failed to persist order");
            if !applied.is_empty() {
                self.compensator.compensate(&applied, &err).await;
            }
            return Err(err);
        }

        info!(order_id = %order.id, total = order.total_amount, "Order created");
        self.announce(Topic::OrdersCreated, &order).await;
        Ok(order)
    }

    /// Validates one line and reads its product, failing fast on visibly short stock.
    async fn check_line(&self, line: &OrderLine) -> Result<ProductSnapshot, OrderError> {
        let product_id = line.product_id;
        if line.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                product_id,
                quantity: line.quantity,
            });
        }

        let product = self
            .inventory
            .get_product(product_id)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    OrderError::ItemNotFound(product_id)
                } else {
                    OrderError::Remote(err)
                }
            })?;

        // The reservation re-checks under the row lock.
        if line.quantity as f64 > product.quantity {
            return Err(OrderError::InsufficientQuantity {
                product_id,
                requested: line.quantity,
                available: product.quantity,
            });
        }
        Ok(product)
    }

    async fn abandon(
        &self,
        applied: &[AppliedReservation],
        line: &OrderLine,
        err: OrderError,
    ) -> OrderError {
        warn!(product_id = %line.product_id, error = %err, "Order line failed");
        if !applied.is_empty() {
            self.compensator.compensate(applied, &err).await;
        }
        err
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders.get(&id).await.map_err(|err| order_error(id, err))
    }

    pub async fn list_orders(&self, pagination: Pagination) -> Result<Page<Order>, OrderError> {
        let total = self.orders.count().await?;
        let data = self.orders.list(&pagination).await?;
        Ok(Page::new(&pagination, total, data))
    }

    #[instrument(skip(self))]
    pub async fn update_order(&self, id: OrderId, update: OrderUpdate) -> Result<Order, OrderError> {
        if update.user_name.is_none() && update.status.is_none() {
            return Err(OrderError::InvalidRequest(
                "at least one field must be provided".into(),
            ));
        }
        if update.user_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(OrderError::InvalidRequest("user_name cannot be empty".into()));
        }

        let now = (self.clock)();
        let policy = Arc::clone(&self.status_policy);
        let outcome = self
            .orders
            .update_by_id(&id, |order| {
                let mut next = order.clone();
                let mut changed = false;
                if let Some(name) = update.user_name.filter(|n| *n != order.user_name) {
                    next.user_name = name;
                    changed = true;
                }
                if let Some(status) = update.status.filter(|s| *s != order.status) {
                    if let Err(err) = policy.check(order.status, status) {
                        return Mutation::Rejected(err);
                    }
                    next.status = status;
                    changed = true;
                }
                if changed {
                    next.updated_at = now;
                }
                Mutation::changed_if(changed, next)
            })
            .await
            .map_err(|err| match err {
                OrderError::Store(StoreError::NotFound { .. }) => OrderError::OrderNotFound(id),
                other => other,
            })?;
        let order = outcome.require_change()?;

        info!(%id, status = %order.status, "Order updated");
        self.announce(Topic::OrdersUpdated, &order).await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get_order(id).await?;
        self.orders
            .delete_by_id(&id)
            .await
            .map_err(|err| order_error(id, err))?;

        info!(%id, "Order deleted");
        self.announce(Topic::OrdersDeleted, &order).await;
        Ok(order)
    }

    /// Publishes an event for a committed change. Failures are logged, never returned.
    async fn announce(&self, topic: Topic, order: &Order) {
        let event = OrderEvent::new(topic, order);
        if let Err(err) = self.publisher.publish(topic, &event).await {
            error!(%topic, order_id = %order.id, event_id = %event.event_id, error = %err, "Failed to publish order event");
        }
    }
}

fn order_error(id: OrderId, err: StoreError) -> OrderError {
    match err {
        StoreError::NotFound { .. } => OrderError::OrderNotFound(id),
        other => other.into(),
    }
}
