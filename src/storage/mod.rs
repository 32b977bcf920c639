//! Durable store adapters.
//!
//! The in-memory backend lives in the framework
//! ([`MemoryStore`](stockroom_framework::MemoryStore)). The Postgres adapters here are
//! compiled with the `postgres` feature.

#[cfg(feature = "postgres")]
pub mod postgres;
