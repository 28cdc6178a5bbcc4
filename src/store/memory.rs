//! In-memory store of record.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::RecordStore;
use crate::error::StoreError;
use crate::models::{CustomerId, CustomerRecord, CustomerStatus, NewCustomer};

/// Thread-safe [`RecordStore`] backed by a vector plus an id index.
///
/// Records are kept in creation order, so listings come back in arrival
/// order without sorting.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<CustomerRecord>,
    index: HashMap<CustomerId, usize>,
}

impl StoreState {
    fn get_mut(&mut self, id: CustomerId) -> Option<&mut CustomerRecord> {
        let slot = *self.index.get(&id)?;
        self.records.get_mut(slot)
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a status unconditionally, bypassing the compare-and-set guard.
    ///
    /// Models an out-of-band writer (another process, an operator fixing a
    /// record by hand). Returns `false` if the id is unknown.
    pub fn force_status(&self, id: CustomerId, status: CustomerStatus) -> bool {
        match self.state().get_mut(id) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }
}

impl RecordStore for InMemoryStore {
    fn create_record(&self, customer: NewCustomer) -> Result<CustomerRecord, StoreError> {
        let mut state = self.state();
        let record = customer.into_record(CustomerId::generate());
        let slot = state.records.len();
        state.index.insert(record.id, slot);
        state.records.push(record.clone());
        Ok(record)
    }

    fn get_record(&self, id: CustomerId) -> Result<Option<CustomerRecord>, StoreError> {
        let state = self.state();
        Ok(state
            .index
            .get(&id)
            .and_then(|&slot| state.records.get(slot))
            .cloned())
    }

    fn list_by_status(&self, status: CustomerStatus) -> Result<Vec<CustomerRecord>, StoreError> {
        Ok(self
            .state()
            .records
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        Ok(self.state().records.clone())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state().records.len())
    }

    fn compare_and_set_status(
        &self,
        id: CustomerId,
        expected: CustomerStatus,
        new_status: CustomerStatus,
        completion_time: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        if !expected.can_transition_to(new_status) {
            return Err(StoreError::IllegalTransition {
                id,
                from: expected,
                to: new_status,
            });
        }

        let mut state = self.state();
        let record = state.get_mut(id).ok_or(StoreError::NotFound(id))?;
        if record.status != expected {
            return Ok(false);
        }
        record.status = new_status;
        if completion_time.is_some() {
            record.completion_time = completion_time;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn new_customer(name: &str) -> NewCustomer {
        NewCustomer {
            queue_number: format!("R-{name}"),
            name: name.into(),
            category: Category::Regular,
            service: "N/A".into(),
            urgency_level: 1,
            has_appointment: false,
            base_score: 3,
            arrival_time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = InMemoryStore::new();
        let record = store.create_record(new_customer("a")).unwrap();
        assert_eq!(record.status, CustomerStatus::Waiting);
        assert_eq!(store.get_record(record.id).unwrap(), Some(record));
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get_record(CustomerId::generate()).unwrap().is_none());
    }

    #[test]
    fn test_list_by_status_in_creation_order() {
        let store = InMemoryStore::new();
        let a = store.create_record(new_customer("a")).unwrap();
        let b = store.create_record(new_customer("b")).unwrap();
        let c = store.create_record(new_customer("c")).unwrap();
        assert!(store
            .compare_and_set_status(b.id, CustomerStatus::Waiting, CustomerStatus::Serving, None)
            .unwrap());

        let waiting: Vec<_> = store
            .list_by_status(CustomerStatus::Waiting)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(waiting, vec![a.id, c.id]);
    }

    #[test]
    fn test_cas_rejects_stale_expectation() {
        let store = InMemoryStore::new();
        let a = store.create_record(new_customer("a")).unwrap();
        assert!(store
            .compare_and_set_status(a.id, CustomerStatus::Waiting, CustomerStatus::Serving, None)
            .unwrap());
        assert!(!store
            .compare_and_set_status(a.id, CustomerStatus::Waiting, CustomerStatus::Serving, None)
            .unwrap());
    }

    #[test]
    fn test_cas_sets_completion_time() {
        let store = InMemoryStore::new();
        let a = store.create_record(new_customer("a")).unwrap();
        let done = Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap();
        store
            .compare_and_set_status(a.id, CustomerStatus::Waiting, CustomerStatus::Serving, None)
            .unwrap();
        store
            .compare_and_set_status(
                a.id,
                CustomerStatus::Serving,
                CustomerStatus::Completed,
                Some(done),
            )
            .unwrap();
        let record = store.get_record(a.id).unwrap().unwrap();
        assert_eq!(record.status, CustomerStatus::Completed);
        assert_eq!(record.completion_time, Some(done));
    }

    #[test]
    fn test_cas_illegal_transition_and_unknown_id() {
        let store = InMemoryStore::new();
        let a = store.create_record(new_customer("a")).unwrap();
        assert!(matches!(
            store.compare_and_set_status(
                a.id,
                CustomerStatus::Completed,
                CustomerStatus::Waiting,
                None
            ),
            Err(StoreError::IllegalTransition { .. })
        ));
        assert!(matches!(
            store.compare_and_set_status(
                CustomerId::generate(),
                CustomerStatus::Waiting,
                CustomerStatus::Serving,
                None
            ),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_cas_has_single_winner() {
        let store = Arc::new(InMemoryStore::new());
        let a = store.create_record(new_customer("a")).unwrap();
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    barrier.wait();
                    if store
                        .compare_and_set_status(
                            a.id,
                            CustomerStatus::Waiting,
                            CustomerStatus::Serving,
                            None,
                        )
                        .unwrap()
                    {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("cas thread panicked");
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_force_status() {
        let store = InMemoryStore::new();
        let a = store.create_record(new_customer("a")).unwrap();
        assert!(store.force_status(a.id, CustomerStatus::Completed));
        assert!(!store.force_status(CustomerId::generate(), CustomerStatus::Completed));
        assert!(store.list_by_status(CustomerStatus::Waiting).unwrap().is_empty());
    }
}
