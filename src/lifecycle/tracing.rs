//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing_subscriber::fmt` subscriber filtered by
//! `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Actor lifecycle**: startup, shutdown and how many requests were drained
//! - **Requests**: one `debug` line per dispatched request with its payload, one `info`
//!   line per completed state change (`Item created`, `Stock reserved`, `Order created`)
//! - **Rejections**: `warn` with the stable status code (`insufficient_quantity`, ...)
//! - **Infrastructure failures**: `error`, with the unredacted cause
//! - **Cache**: refresh size, and every failed periodic refresh
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run
//!
//! # payloads and cache hits
//! RUST_LOG=debug cargo run
//!
//! # only the order side
//! RUST_LOG=stockroom::orders=debug cargo run
//! ```
//!
//! A placement of two lines looks like this at `info`:
//!
//! ```text
//! INFO create_order{user_id=... lines=2}: Sending create_order to actor
//! INFO Stock reserved id=... quantity=2 remaining=8
//! INFO Stock reserved id=... quantity=1 remaining=4
//! INFO create_order{user_id=... lines=2}: Order created order_id=... total=41.5
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
