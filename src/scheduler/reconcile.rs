//! Rebuilding the live scheduler from the store of record.
//!
//! The store is the source of truth; the live scheduler is a cache of who
//! is waiting. The cache is rebuilt at startup and whenever it is caught
//! empty while the store still lists waiting customers (a restart that
//! skipped the startup rebuild, or a lost admit).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::LiveScheduler;
use crate::error::StoreError;
use crate::models::CustomerStatus;
use crate::store::RecordStore;

/// Keeps a [`LiveScheduler`] in step with the store of record.
#[derive(Debug)]
pub struct Reconciler<S> {
    store: Arc<S>,
}

impl<S: RecordStore> Reconciler<S> {
    /// Creates a reconciler reading from `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Replaces the scheduler's contents with every waiting record.
    ///
    /// The listing happens under the scheduler's lock, so a registration
    /// admitted while the rebuild runs is never wiped. Returns the number of
    /// customers admitted.
    pub fn rebuild_from_store(
        &self,
        scheduler: &LiveScheduler<S>,
        evaluated_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let admitted = scheduler.replace_with(
            || self.store.list_by_status(CustomerStatus::Waiting),
            evaluated_at,
        )?;
        info!(admitted, "rebuilt live scheduler from store");
        Ok(admitted)
    }

    /// Whether the scheduler is empty while the store has waiting records.
    pub fn is_diverged(&self, scheduler: &LiveScheduler<S>) -> Result<bool, StoreError> {
        if !scheduler.is_empty() {
            return Ok(false);
        }
        Ok(!self.store.list_by_status(CustomerStatus::Waiting)?.is_empty())
    }

    /// Rebuilds if diverged. Returns `true` when a rebuild happened.
    pub fn ensure_consistent(
        &self,
        scheduler: &LiveScheduler<S>,
        evaluated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if !self.is_diverged(scheduler)? {
            return Ok(false);
        }
        warn!("live scheduler is empty but store has waiting customers; rebuilding");
        self.rebuild_from_store(scheduler, evaluated_at)?;
        Ok(true)
    }
}
