use crate::clients::{CategoryClient, InventoryPort, ItemClient, OrderClient};
use crate::clock::{system_clock, Clock};
use crate::config::Settings;
use crate::events::{BroadcastBus, EventPublisher};
use crate::inventory::InventoryService;
use crate::model::{Category, InventoryItem, Order};
use crate::orders::OrderCoordinator;
use std::sync::Arc;
use stockroom_framework::{
    MemoryStore, ReadThroughCache, Repository, ResourceActor, ResourceClient, StoreError, Table,
};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("initial cache load failed: {0}")]
    Store(#[from] StoreError),

    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("task failed: {0}")]
    Task(#[from] JoinError),
}

/// The in-memory tables behind [`StockSystem::with_memory`].
///
/// Clones share rows, so a test can keep a handle and inspect committed state.
#[derive(Clone, Default)]
pub struct MemoryBackends {
    pub items: MemoryStore<InventoryItem>,
    pub categories: MemoryStore<Category>,
    pub orders: MemoryStore<Order>,
}

/// The running stock reservation system.
///
/// `StockSystem` is responsible for:
/// - **Wiring**: store -> cache -> service -> actor -> client, for items and categories;
///   the order coordinator gets an item client as its inventory port and the event bus
///   as its publisher.
/// - **Background work**: one periodic refresh task per cache.
/// - **Shutdown**: stopping everything in dependency order.
///
/// # Example
///
/// ```ignore
/// let system = StockSystem::in_memory(Settings::default()).await?;
///
/// let category = system.categories.create_category(params).await?;
/// let item = system.items.create_item(item_params).await?;
/// let order = system.orders.create_order(order_params).await?;
///
/// system.shutdown().await?;
/// ```
pub struct StockSystem {
    pub items: ItemClient,
    pub categories: CategoryClient,
    pub orders: OrderClient,

    /// Subscribe here to receive `orders.*` events.
    pub bus: BroadcastBus,

    /// Actor tasks; the order actor comes first because it holds an item client.
    handles: Vec<JoinHandle<()>>,

    refreshers: Vec<JoinHandle<()>>,
}

impl StockSystem {
    /// Starts the system on fresh in-memory tables.
    pub async fn in_memory(settings: Settings) -> Result<Self, SystemError> {
        Self::with_memory(settings, &MemoryBackends::default(), system_clock()).await
    }

    /// Starts the system on the given in-memory tables and clock.
    pub async fn with_memory(
        settings: Settings,
        backends: &MemoryBackends,
        clock: Clock,
    ) -> Result<Self, SystemError> {
        Self::start(
            settings,
            Table::new(backends.items.clone()),
            Table::new(backends.categories.clone()),
            Table::new(backends.orders.clone()),
            clock,
        )
        .await
    }

    /// Connects to Postgres, creates missing tables and starts the system on them.
    #[cfg(feature = "postgres")]
    pub async fn postgres(settings: Settings) -> Result<Self, SystemError> {
        use crate::storage::postgres::{self, PgCategories, PgItems, PgOrders};
        use sqlx::postgres::PgPoolOptions;

        let database = settings.database.clone().ok_or_else(|| {
            config::ConfigError::NotFound("database.url".to_string())
        })?;
        let pool = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .connect(&database.url)
            .await?;
        postgres::ensure_schema(&pool).await?;

        Self::start(
            settings,
            Table::new(PgItems::new(pool.clone())),
            Table::new(PgCategories::new(pool.clone())),
            Table::new(PgOrders::new(pool)),
            system_clock(),
        )
        .await
    }

    /// Wires and spawns everything on top of the given repositories.
    ///
    /// Both caches are filled before the first request is accepted.
    pub async fn start<I, C, O>(
        settings: Settings,
        items: I,
        categories: C,
        orders: O,
        clock: Clock,
    ) -> Result<Self, SystemError>
    where
        I: Repository<InventoryItem> + 'static,
        C: Repository<Category> + 'static,
        O: Repository<Order> + 'static,
    {
        // 1. Caches, loaded once up front and then on a timer
        let item_cache = Arc::new(ReadThroughCache::new(items));
        let category_cache = Arc::new(ReadThroughCache::new(categories));
        item_cache.refresh().await?;
        category_cache.refresh().await?;
        let refreshers = vec![
            item_cache.spawn_refresh(settings.cache_refresh()),
            category_cache.spawn_refresh(settings.cache_refresh()),
        ];

        // 2. Create actors (no dependencies)
        let (item_actor, item_client) = ResourceActor::<InventoryItem>::new(settings.channel_buffer);
        let (category_actor, category_client) =
            ResourceActor::<Category>::new(settings.channel_buffer);
        let (order_actor, order_client) = ResourceActor::<Order>::new(settings.channel_buffer);

        let item_client = bounded(item_client, &settings);
        let category_client = bounded(category_client, &settings);
        let order_client = bounded(order_client, &settings);

        // 3. Start actors; one inventory service serves both items and categories
        let inventory = Arc::new(InventoryService::new(
            item_cache,
            category_cache,
            Arc::clone(&clock),
        ));
        let items = ItemClient::new(item_client);
        let bus = BroadcastBus::new(settings.event_capacity);
        let port: Arc<dyn InventoryPort> = Arc::new(items.clone());
        let publisher: Arc<dyn EventPublisher> = Arc::new(bus.clone());
        let coordinator = Arc::new(OrderCoordinator::new(orders, port, publisher, clock));

        let handles = vec![
            tokio::spawn(order_actor.run(coordinator)),
            tokio::spawn(item_actor.run(Arc::clone(&inventory))),
            tokio::spawn(category_actor.run(inventory)),
        ];
        info!(
            refresh_secs = settings.cache_refresh_secs,
            timeout_ms = settings.request_timeout_ms,
            "System started"
        );

        Ok(Self {
            items,
            categories: CategoryClient::new(category_client),
            orders: OrderClient::new(order_client),
            bus,
            handles,
            refreshers,
        })
    }

    /// Gracefully shuts down the entire system.
    ///
    /// 1. Stops the cache refresh tasks.
    /// 2. Drops all clients, which closes the request channels.
    /// 3. Waits for each actor to drain its in-flight requests. The item actor only
    ///    stops once the order actor, which holds an item client, has stopped.
    ///
    /// Returns an error if any actor task panicked.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        for refresher in &self.refreshers {
            refresher.abort();
        }
        for refresher in self.refreshers {
            if let Err(err) = refresher.await {
                if !err.is_cancelled() {
                    error!(error = %err, "Cache refresh task failed");
                    return Err(err.into());
                }
            }
        }

        drop(self.orders);
        drop(self.items);
        drop(self.categories);

        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "Actor task failed");
                return Err(err.into());
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

fn bounded<T: stockroom_framework::Resource>(
    client: ResourceClient<T>,
    settings: &Settings,
) -> ResourceClient<T> {
    match settings.request_timeout() {
        Some(limit) => client.with_timeout(limit),
        None => client,
    }
}
