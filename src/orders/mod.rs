//! The order placement coordinator and its policies.

mod coordinator;
mod error;
mod handler;
pub mod policy;

pub use coordinator::OrderCoordinator;
pub use error::OrderError;
pub use policy::{
    AppliedReservation, Compensator, NoCompensation, PermissiveStatusPolicy, StatusPolicy,
    TerminalStatusPolicy,
};
