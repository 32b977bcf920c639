//! Pluggable order policies.
//!
//! Two seams let deployments tighten order handling without touching the coordinator:
//!
//! - [`StatusPolicy`] decides which status transitions an update may perform.
//! - [`Compensator`] is told about reservations left behind by a failed placement.
//!
//! The defaults accept every transition and leave reservations in place.

use super::OrderError;
use crate::model::{ItemId, OrderLine, OrderStatus};
use async_trait::async_trait;
use tracing::warn;

pub trait StatusPolicy: Send + Sync {
    fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError>;
}

/// Accepts any transition, including leaving a terminal status.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveStatusPolicy;

impl StatusPolicy for PermissiveStatusPolicy {
    fn check(&self, _from: OrderStatus, _to: OrderStatus) -> Result<(), OrderError> {
        Ok(())
    }
}

/// Forbids moving out of `completed`, `cancelled` and `refunded`, except
/// `completed -> refunded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalStatusPolicy;

impl StatusPolicy for TerminalStatusPolicy {
    fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        use OrderStatus::*;
        match (from, to) {
            _ if from == to => Ok(()),
            (Completed, Refunded) => Ok(()),
            (Completed | Cancelled | Refunded, _) => {
                Err(OrderError::TransitionRejected { from, to })
            }
            _ => Ok(()),
        }
    }
}

/// A reservation made during a placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedReservation {
    pub product_id: ItemId,
    pub quantity: i64,
    /// False when the reserve call timed out: the inventory service may or may not
    /// have applied it.
    pub confirmed: bool,
}

impl AppliedReservation {
    pub fn confirmed(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            confirmed: true,
        }
    }

    pub fn unconfirmed(line: &OrderLine) -> Self {
        Self {
            confirmed: false,
            ..Self::confirmed(line)
        }
    }
}

/// Handles reservations stranded by a placement that failed part way.
#[async_trait]
pub trait Compensator: Send + Sync {
    async fn compensate(&self, applied: &[AppliedReservation], cause: &OrderError);
}

/// Leaves stock reserved and records what was stranded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompensation;

#[async_trait]
impl Compensator for NoCompensation {
    async fn compensate(&self, applied: &[AppliedReservation], cause: &OrderError) {
        for reservation in applied {
            warn!(
                product_id = %reservation.product_id,
                quantity = reservation.quantity,
                confirmed = reservation.confirmed,
                error = %cause,
                "Reservation left in place after failed order"
            );
        }
    }
}
