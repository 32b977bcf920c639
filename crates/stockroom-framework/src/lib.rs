//! # Stockroom Framework
//!
//! Building blocks for services that own a piece of persistent state and serve it to
//! other services over typed request channels.
//!
//! ## Architecture Overview
//!
//! The crate separates four concerns:
//!
//! 1. **Records** ([`Record`], [`Resource`]) - the rows a service owns and the payloads
//!    of its request surface.
//! 2. **Storage** ([`StoreAdapter`], [`Repository`], [`Table`]) - row-locked
//!    transactions and the one mutation primitive, `update_by_id`. [`MemoryStore`] is the
//!    in-process backend; [`ReadThroughCache`] wraps any repository.
//! 3. **Runtime** ([`ResourceActor`], [`ResourceHandler`]) - receives requests and runs
//!    each on its own task against a handler, usually a domain service.
//! 4. **Interface** ([`ResourceClient`], [`ActorClient`]) - the cloneable, type-safe
//!    sending side. Errors cross the channel as a [`Status`] with a stable [`Code`].
//!
//! ## Read-Lock-Mutate-Persist
//!
//! Every state change goes through [`Repository::update_by_id`] with a pure mutation
//! returning a [`Mutation`]. The engine locks the row, runs the mutation, and either
//! rolls back, commits without a write, or persists. Two concurrent mutations of the same
//! row are serialised by the lock, so neither update is lost.
//!
//! ```ignore
//! let outcome = items
//!     .update_by_id(&id, |item| {
//!         if quantity as f64 > item.quantity {
//!             return Mutation::Rejected(InventoryError::InsufficientQuantity { .. });
//!         }
//!         let mut next = item.clone();
//!         next.quantity -= quantity as f64;
//!         Mutation::Changed(next)
//!     })
//!     .await?;
//! ```
//!
//! ## Wiring
//!
//! ```ignore
//! let (actor, client) = ResourceActor::<InventoryItem>::new(32);
//! let service = Arc::new(InventoryService::new(items, categories, clock));
//! tokio::spawn(actor.run(service));
//!
//! let item = client.get(id).await?;
//! ```
//!
//! Handlers receive their dependencies (other clients, publishers) at construction, so
//! actors can be created first and wired afterwards.
//!
//! ## Testing
//!
//! [`MemoryStore`] counts reads and writes, and [`mock::MockClient`] answers a real
//! `ResourceClient` from a queue of expectations. See the [`mock`] module.

pub mod actor;
pub mod cache;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod memory;
pub mod message;
pub mod mock;
pub mod mutation;
pub mod pagination;
pub mod store;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use cache::ReadThroughCache;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::{Record, Resource, ResourceHandler};
pub use error::{Code, FrameworkError, Status, StoreError, ToStatus};
pub use memory::{MemoryStore, MemoryTx, StoreStats};
pub use message::{ResourceRequest, Response};
pub use mutation::{Mutation, Outcome};
pub use pagination::{InvalidSortOption, Page, Pagination, SortOption, MAX_PAGE_SIZE};
pub use store::{Repository, StoreAdapter, Table, Transaction};
