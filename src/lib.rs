//! # Stockroom
//!
//! Stock reservation across two services: an inventory service that owns items,
//! categories and their on-hand quantities, and an order service that places orders by
//! reserving stock line by line.
//!
//! ## Architecture
//!
//! Both services are built from the same parts in
//! [`stockroom_framework`]: a store adapter with row locks, the read-lock-mutate-persist
//! update engine, and an actor serving a typed request channel.
//!
//! ```text
//!  OrderClient ──► order actor ──► OrderCoordinator ──► orders table
//!                                     │      │
//!                                     │      └──► EventPublisher (orders.created|updated|deleted)
//!                                     ▼
//!                                 ItemClient ──► item actor ──► InventoryService ──► cache ──► items table
//! ```
//!
//! - [`inventory`]: item and category CRUD plus the `reserve` operation, which checks and
//!   decrements stock under the item's row lock.
//! - [`orders`]: placement, maintenance and status policy. Placement calls the inventory
//!   service for each line in order and stops at the first failure.
//! - [`clients`]: domain wrappers around the framework's request channel.
//! - [`events`]: order events and the in-process broadcast bus.
//! - [`lifecycle`]: wiring, startup and shutdown ([`StockSystem`](lifecycle::StockSystem)).
//! - [`storage`]: the Postgres adapters (feature `postgres`).
//!
//! ## Error Codes
//!
//! Every failure reaching a caller carries a stable [`Code`](stockroom_framework::Code):
//! `not_found`, `invalid_argument`, `insufficient_quantity`, `not_updated`,
//! `constraint_violation`, `internal`, `unavailable`, `deadline_exceeded`. Internal
//! failures are logged in full and sent as a generic message.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=info cargo run
//!
//! # against Postgres
//! STOCKROOM_DATABASE__URL=postgres://localhost/stockroom cargo run --features postgres
//! ```

pub mod clients;
pub mod clock;
pub mod config;
pub mod events;
pub mod inventory;
pub mod lifecycle;
pub mod model;
pub mod orders;
pub mod storage;
