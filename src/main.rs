//! # Stockroom demo
//!
//! Starts the system, stocks one item and places two orders against it: one that fits
//! and one that asks for more than is left.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

use stockroom::config::Settings;
use stockroom::lifecycle::tracing::setup_tracing;
use stockroom::lifecycle::{StockSystem, SystemError};
use stockroom::model::{CategoryCreate, ItemCreate, OrderCreate, OrderLine, UserId};
use stockroom_framework::ActorClient;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let settings = Settings::load()?;
    info!(?settings, "Starting stockroom");

    let system = start(settings).await?;

    let category = system
        .categories
        .create_category(CategoryCreate {
            name: "Hardware".to_string(),
            description: "Fasteners and fittings".to_string(),
        })
        .await?;

    let item = system
        .items
        .create_item(ItemCreate {
            name: "Hex bolt M8".to_string(),
            description: "Zinc plated, 40mm".to_string(),
            category_id: category.id,
            price: 0.35,
            quantity: 10.0,
            unit: "pcs".to_string(),
        })
        .await?;
    info!(item_id = %item.id, quantity = item.quantity, "Item stocked");

    let mut events = system.bus.subscribe();
    let user_id = UserId::new();

    // Fits: 7 of 10
    let span = tracing::info_span!("order_processing");
    let placed = async {
        system
            .orders
            .create_order(OrderCreate {
                user_id,
                user_name: "Alice".to_string(),
                items: vec![OrderLine {
                    product_id: item.id,
                    quantity: 7,
                }],
            })
            .await
    }
    .instrument(span)
    .await;
    match placed {
        Ok(order) => info!(order_id = %order.id, total = order.total_amount, "Order placed"),
        Err(e) => error!(error = %e, "Order placement failed"),
    }

    // Does not fit: 5 of the 3 left
    let rejected = system
        .orders
        .create_order(OrderCreate {
            user_id,
            user_name: "Alice".to_string(),
            items: vec![OrderLine {
                product_id: item.id,
                quantity: 5,
            }],
        })
        .await;
    if let Err(e) = rejected {
        warn!(code = %e.code(), error = %e, "Order rejected");
    }

    while let Ok(envelope) = events.try_recv() {
        info!(topic = %envelope.topic, bytes = envelope.payload.len(), "Event received");
    }

    let item = system.items.get(item.id).await?;
    info!(item_id = %item.id, quantity = item.quantity, "Remaining stock");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn start(settings: Settings) -> Result<StockSystem, SystemError> {
    if settings.database.is_some() {
        return StockSystem::postgres(settings).await;
    }
    StockSystem::in_memory(settings).await
}

#[cfg(not(feature = "postgres"))]
async fn start(settings: Settings) -> Result<StockSystem, SystemError> {
    if settings.database.is_some() {
        warn!("Database configured but the postgres feature is off; using memory");
    }
    StockSystem::in_memory(settings).await
}
