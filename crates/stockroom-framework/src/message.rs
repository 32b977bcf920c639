//! # Generic Messages
//!
//! This module defines the message types exchanged between a `ResourceClient` and a
//! `ResourceActor`.

use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::pagination::{Page, Pagination};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// A request sent to the actor serving resource `T`.
///
/// The variants are the standard lifecycle operations (create, get, update, delete,
/// list) plus `Action` for resource-specific operations such as a stock reservation.
/// The payload types come from [`Resource`], so a request for one resource cannot carry
/// another resource's payload.
pub enum ResourceRequest<T: Resource> {
    Create {
        params: T::Create,
        respond_to: Response<T>,
    },
    Get {
        id: T::Id,
        respond_to: Response<T>,
    },
    Update {
        id: T::Id,
        update: T::Update,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<T>,
    },
    List {
        pagination: Pagination,
        respond_to: Response<Page<T>>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}

impl<T: Resource> ResourceRequest<T> {
    /// Operation name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            ResourceRequest::Create { .. } => "Create",
            ResourceRequest::Get { .. } => "Get",
            ResourceRequest::Update { .. } => "Update",
            ResourceRequest::Delete { .. } => "Delete",
            ResourceRequest::List { .. } => "List",
            ResourceRequest::Action { .. } => "Action",
        }
    }
}
