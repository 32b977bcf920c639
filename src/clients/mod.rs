//! Type-safe wrappers around [`ResourceClient`](stockroom_framework::ResourceClient).

pub mod category_client;
pub mod item_client;
pub mod order_client;
pub mod port;

pub use category_client::*;
pub use item_client::*;
pub use order_client::*;
pub use port::*;
