//! # Framework Errors
//!
//! Three layers of errors live here:
//!
//! - [`StoreError`]: what a storage backend reports (missing row, constraint, infrastructure).
//! - [`Status`] / [`Code`]: the stable, serialisable shape an error takes when it crosses
//!   the request channel between a client and a [`ResourceActor`](crate::ResourceActor).
//! - [`FrameworkError`]: what a client sees, either a transport failure or a remote `Status`.
//!
//! Domain errors implement [`ToStatus`] so the actor can convert them without knowing
//! their concrete type. Callers branch on [`Code`], never on message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stable error code carried across the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    NotFound,
    InvalidArgument,
    InsufficientQuantity,
    NotUpdated,
    ConstraintViolation,
    Internal,
    Unavailable,
    DeadlineExceeded,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::NotFound => "not_found",
            Code::InvalidArgument => "invalid_argument",
            Code::InsufficientQuantity => "insufficient_quantity",
            Code::NotUpdated => "not_updated",
            Code::ConstraintViolation => "constraint_violation",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error as seen on the far side of the request channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Infrastructure failures never leak their details to the caller.
    pub fn internal() -> Self {
        Self::new(Code::Internal, "internal error")
    }
}

/// Conversion from a domain error into a wire [`Status`].
pub trait ToStatus {
    fn to_status(&self) -> Status;
}

/// Errors reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("not updated")]
    NotUpdated,
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("store failure: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        StoreError::Internal(err.to_string())
    }

    pub fn code(&self) -> Code {
        match self {
            StoreError::NotFound { .. } => Code::NotFound,
            StoreError::NotUpdated => Code::NotUpdated,
            StoreError::ConstraintViolation(_) => Code::ConstraintViolation,
            StoreError::Internal(_) => Code::Internal,
        }
    }
}

impl ToStatus for StoreError {
    fn to_status(&self) -> Status {
        match self {
            StoreError::Internal(_) => Status::internal(),
            other => Status::new(other.code(), other.to_string()),
        }
    }
}

/// Errors a client can observe when talking to an actor.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
    #[error(transparent)]
    Status(#[from] Status),
}

impl FrameworkError {
    pub fn code(&self) -> Code {
        match self {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => Code::Unavailable,
            FrameworkError::DeadlineExceeded(_) => Code::DeadlineExceeded,
            FrameworkError::Status(status) => status.code,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Code::NotFound
    }
}

impl ToStatus for FrameworkError {
    fn to_status(&self) -> Status {
        match self {
            FrameworkError::Status(status) => status.clone(),
            other => Status::new(other.code(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_store_errors_are_redacted() {
        let status = StoreError::internal("connection reset by peer").to_status();
        assert_eq!(status.code, Code::Internal);
        assert!(!status.message.contains("connection reset"));
    }

    #[test]
    fn remote_status_passes_through_verbatim() {
        let err = FrameworkError::from(Status::new(Code::InsufficientQuantity, "only 3 left"));
        assert_eq!(err.code(), Code::InsufficientQuantity);
        assert_eq!(err.to_status().message, "only 3 left");
    }

    #[test]
    fn transport_failures_are_unavailable() {
        assert_eq!(FrameworkError::ActorClosed.code(), Code::Unavailable);
        assert_eq!(
            FrameworkError::DeadlineExceeded(Duration::from_millis(5)).code(),
            Code::DeadlineExceeded
        );
    }
}
