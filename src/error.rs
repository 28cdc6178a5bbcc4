//! Error types.

use thiserror::Error;

use crate::models::{CustomerId, CustomerStatus};
use crate::validation::ValidationError;

/// Faults raised by a [`RecordStore`](crate::store::RecordStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Customer record not found: {0}")]
    NotFound(CustomerId),

    #[error("Illegal status transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: CustomerId,
        from: CustomerStatus,
        to: CustomerStatus,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the queue service.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid registration: {}", summarize(.0))]
    InvalidRegistration(Vec<ValidationError>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
