//! Walk-in service scheduler.
//!
//! Orders waiting customers by a priority score that combines a fixed
//! registration-time score (category, urgency, appointment) with an aging
//! bonus that grows while they wait, and hands out the next customer to
//! serve while staying consistent with a durable store of record.
//!
//! # Modules
//!
//! - **`scoring`**: Base and current (aged) scores
//! - **`ranking`**: Three-way partition ranking for display order
//! - **`scheduler`**: Live heap, store reconciliation, service facade, KPIs
//! - **`store`**: Store of record trait and in-memory backend
//! - **`models`**: Customer records and read models
//! - **`validation`**: Registration input checks
//! - **`config`**: Service configuration
//!
//! # Logging
//!
//! Emits `tracing` events; install a subscriber in the host process to see
//! them.

pub mod config;
pub mod error;
pub mod models;
pub mod ranking;
pub mod scheduler;
pub mod scoring;
pub mod store;
pub mod validation;

pub use error::{QueueError, QueueResult, StoreError};
