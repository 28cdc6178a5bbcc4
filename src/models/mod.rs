//! Queue domain models.
//!
//! # Types
//!
//! | Type | Role |
//! |------|------|
//! | `CustomerRecord` | Durable record held by the store of record |
//! | `NewCustomer` | Fields for creating a record |
//! | `Registration` | Intake input before validation and scoring |
//! | `QueueView` | Ranked, display-ready queue at one instant |

mod customer;
mod view;

pub use customer::{Category, CustomerId, CustomerRecord, CustomerStatus, NewCustomer};
pub use view::{
    AgingAlert, PriorityLevel, QueueEntry, QueueView, RegisteredCustomer, Registration,
    ServedCustomer, ServingSummary,
};
