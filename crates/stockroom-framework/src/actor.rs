//! # Generic Actor Server
//!
//! This module defines the `ResourceActor`, the server half of a resource. It owns the
//! receiving end of the request channel and hands every request to a
//! [`ResourceHandler`].
//!
//! Unlike a classic single-threaded actor, requests are not processed one at a time:
//! each one runs on its own task so that a slow reservation on one item never holds up
//! a read of another. Isolation between concurrent writers comes from the row locks of
//! the store behind the handler.

use crate::client::ResourceClient;
use crate::entity::{Resource, ResourceHandler};
use crate::error::{Code, FrameworkError, ToStatus};
use crate::message::ResourceRequest;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// The server side of a resource.
///
/// # Usage Pattern
///
/// 1.  **Create**: `ResourceActor::new()` returns the `actor` and its `client`.
/// 2.  **Wire**: build the handler, handing it any clients it depends on.
/// 3.  **Run**: spawn `actor.run(handler)`.
///
/// The loop ends once every client clone has been dropped. In-flight requests are
/// awaited before `run` returns.
pub struct ResourceActor<T: Resource> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
}

impl<T: Resource> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the capacity of the request channel; senders wait while it is
    /// full.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { receiver }, ResourceClient::new(sender))
    }

    pub async fn run<H>(mut self, handler: Arc<H>)
    where
        H: ResourceHandler<T>,
    {
        // "InventoryItem" rather than "stockroom::model::item::InventoryItem"
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(request) => {
                        debug!(entity_type, operation = request.operation(), "Dispatch");
                        in_flight.spawn(dispatch(Arc::clone(&handler), request, entity_type));
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(err) = joined {
                        error!(entity_type, error = %err, "Request task failed");
                    }
                }
            }
        }

        let pending = in_flight.len();
        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = joined {
                error!(entity_type, error = %err, "Request task failed");
            }
        }
        info!(entity_type, drained = pending, "Shutdown");
    }
}

async fn dispatch<T, H>(handler: Arc<H>, request: ResourceRequest<T>, entity_type: &'static str)
where
    T: Resource,
    H: ResourceHandler<T>,
{
    match request {
        ResourceRequest::Create { params, respond_to } => {
            debug!(entity_type, ?params, "Create");
            let result = handler.create(params).await;
            if let Ok(created) = &result {
                info!(entity_type, id = %created.id(), "Created");
            }
            reply(respond_to, result, entity_type, "Create");
        }
        ResourceRequest::Get { id, respond_to } => {
            let result = handler.get(&id).await;
            debug!(entity_type, %id, found = result.is_ok(), "Get");
            reply(respond_to, result, entity_type, "Get");
        }
        ResourceRequest::Update {
            id,
            update,
            respond_to,
        } => {
            debug!(entity_type, %id, ?update, "Update");
            let result = handler.update(&id, update).await;
            if result.is_ok() {
                info!(entity_type, %id, "Updated");
            }
            reply(respond_to, result, entity_type, "Update");
        }
        ResourceRequest::Delete { id, respond_to } => {
            debug!(entity_type, %id, "Delete");
            let result = handler.delete(&id).await;
            if result.is_ok() {
                info!(entity_type, %id, "Deleted");
            }
            reply(respond_to, result, entity_type, "Delete");
        }
        ResourceRequest::List {
            pagination,
            respond_to,
        } => {
            debug!(entity_type, page = pagination.page, size = pagination.page_size, "List");
            let result = handler.list(pagination).await;
            reply(respond_to, result, entity_type, "List");
        }
        ResourceRequest::Action {
            id,
            action,
            respond_to,
        } => {
            debug!(entity_type, %id, ?action, "Action");
            let result = handler.handle_action(&id, action).await;
            if result.is_ok() {
                info!(entity_type, %id, "Action ok");
            }
            reply(respond_to, result, entity_type, "Action");
        }
    }
}

/// Converts a handler result into its wire form and sends it back.
///
/// Internal errors are logged in full here because the caller only receives a redacted
/// status.
fn reply<R, E>(
    respond_to: oneshot::Sender<Result<R, FrameworkError>>,
    result: Result<R, E>,
    entity_type: &'static str,
    operation: &'static str,
) where
    E: std::error::Error + ToStatus,
{
    let result = result.map_err(|err| {
        let status = err.to_status();
        if status.code == Code::Internal {
            error!(entity_type, operation, error = %err, "Request failed");
        } else {
            warn!(entity_type, operation, code = %status.code, error = %err, "Request rejected");
        }
        FrameworkError::Status(status)
    });
    if respond_to.send(result).is_err() {
        debug!(entity_type, operation, "Caller went away before the reply");
    }
}
