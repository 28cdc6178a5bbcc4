//! Store of record interface.
//!
//! The scheduler keeps only ids and scores in memory; the store owns the
//! authoritative customer records. Any backend (SQL table, KV store) can
//! implement [`RecordStore`]. [`InMemoryStore`] is the reference backend.
//!
//! # Contract
//! - Reads observe the process's own prior writes.
//! - [`RecordStore::compare_and_set_status`] is atomic: it changes the
//!   status only if the current status equals `expected`.

mod memory;

pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{CustomerId, CustomerRecord, CustomerStatus, NewCustomer};

/// Durable customer record store.
pub trait RecordStore: Send + Sync {
    /// Persists a new `waiting` record and returns it with its assigned id.
    fn create_record(&self, customer: NewCustomer) -> Result<CustomerRecord, StoreError>;

    /// Looks up one record. Absence is `Ok(None)`, not an error.
    fn get_record(&self, id: CustomerId) -> Result<Option<CustomerRecord>, StoreError>;

    /// All records with the given status, in arrival order.
    fn list_by_status(&self, status: CustomerStatus) -> Result<Vec<CustomerRecord>, StoreError>;

    /// All records, in arrival order.
    fn list_all(&self) -> Result<Vec<CustomerRecord>, StoreError>;

    /// Total number of records ever created.
    fn count(&self) -> Result<usize, StoreError>;

    /// Atomically moves `id` from `expected` to `new_status`.
    ///
    /// Returns `Ok(false)` when the record's status is no longer `expected`
    /// (another actor got there first). `completion_time` is written
    /// alongside the status when given.
    fn compare_and_set_status(
        &self,
        id: CustomerId,
        expected: CustomerStatus,
        new_status: CustomerStatus,
        completion_time: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;
}
