//! Heap-backed live ordering of waiting customers.
//!
//! # Staleness
//!
//! Each heap entry carries the score it had when it was last scored. Scores
//! grow with waiting time, so entries go stale as the clock moves; the heap
//! is not re-sorted on every tick. Instead, [`LiveScheduler::claim_highest`]
//! revalidates at claim time.
//!
//! # Claim Algorithm
//!
//! No customer can gain more than [`MAX_AGING_BONUS`] over their base score,
//! and every stored score is at least the base score. So an entry whose
//! stored score is `s` can currently score at most `s + MAX_AGING_BONUS`.
//!
//! 1. Pop entries (highest stored score first) into a candidate pool,
//!    rescoring each at the evaluation instant, until the heap top cannot
//!    beat the best candidate even with the maximum bonus.
//! 2. Take the best candidate and check its record in the store. Absent or
//!    no longer waiting: drop it permanently and go back to step 1.
//! 3. Re-admit the remaining candidates with their fresh scores.
//!
//! The winner is the global maximum at the evaluation instant. Each loop
//! iteration removes an entry from the heap or the pool, so the claim
//! terminates within the heap size.
//!
//! # Complexity
//! O(k log n) per claim, where k is the number of entries whose stored score
//! is within [`MAX_AGING_BONUS`] of the winner.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Category, CustomerId, CustomerRecord};
use crate::scoring::{self, MAX_AGING_BONUS};
use crate::store::RecordStore;

/// One resident of the live scheduler.
///
/// Ordered by score (higher first), then arrival (earlier first), then id.
#[derive(Debug, Clone)]
pub struct HeapEntry {
    /// Score as of the last time the entry was scored.
    pub score: i64,
    pub arrival_time: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub category: Category,
    pub base_score: i64,
}

impl HeapEntry {
    /// Creates an entry scored at `evaluated_at`.
    pub fn new(
        customer_id: CustomerId,
        category: Category,
        base_score: i64,
        arrival_time: DateTime<Utc>,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        let (score, _) =
            scoring::current_score_at(base_score, &category, arrival_time, evaluated_at);
        Self {
            score,
            arrival_time,
            customer_id,
            category,
            base_score,
        }
    }

    /// Entry for a stored record.
    pub fn from_record(record: &CustomerRecord, evaluated_at: DateTime<Utc>) -> Self {
        Self::new(
            record.id,
            record.category.clone(),
            record.base_score,
            record.arrival_time,
            evaluated_at,
        )
    }

    fn rescore(&mut self, evaluated_at: DateTime<Utc>) {
        let (score, _) = scoring::current_score_at(
            self.base_score,
            &self.category,
            self.arrival_time,
            evaluated_at,
        );
        self.score = score;
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.arrival_time.cmp(&self.arrival_time))
            .then_with(|| other.customer_id.cmp(&self.customer_id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Live priority structure over waiting customers.
///
/// One mutex guards the heap for the whole of every operation. Share a
/// single instance per process behind an `Arc`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use chrono::Utc;
/// use walkin_queue::models::{Category, NewCustomer};
/// use walkin_queue::scheduler::LiveScheduler;
/// use walkin_queue::store::{InMemoryStore, RecordStore};
///
/// let store = Arc::new(InMemoryStore::new());
/// let now = Utc::now();
/// let record = store.create_record(NewCustomer {
///     queue_number: "P-001".into(),
///     name: "Ana".into(),
///     category: Category::Pwd,
///     service: "N/A".into(),
///     urgency_level: 1,
///     has_appointment: false,
///     base_score: 7,
///     arrival_time: now,
/// }).unwrap();
///
/// let scheduler = LiveScheduler::new(Arc::clone(&store));
/// scheduler.admit_record(&record, now);
/// assert_eq!(scheduler.claim_highest(now).unwrap(), Some(record.id));
/// ```
#[derive(Debug)]
pub struct LiveScheduler<S> {
    heap: Mutex<BinaryHeap<HeapEntry>>,
    store: Arc<S>,
}

impl<S: RecordStore> LiveScheduler<S> {
    /// Creates an empty scheduler revalidating against `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            store,
        }
    }

    /// The store of record used for revalidation.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, BinaryHeap<HeapEntry>> {
        // Heap operations never leave a half-applied state behind.
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a customer scored at `evaluated_at`.
    ///
    /// Admitting an id that is already resident adds a duplicate entry;
    /// claim-time revalidation filters it.
    pub fn admit(
        &self,
        customer_id: CustomerId,
        category: Category,
        base_score: i64,
        arrival_time: DateTime<Utc>,
        evaluated_at: DateTime<Utc>,
    ) {
        let entry = HeapEntry::new(customer_id, category, base_score, arrival_time, evaluated_at);
        push_locked(&mut self.lock(), entry);
    }

    /// Admits a stored record.
    pub fn admit_record(&self, record: &CustomerRecord, evaluated_at: DateTime<Utc>) {
        push_locked(&mut self.lock(), HeapEntry::from_record(record, evaluated_at));
    }

    /// Removes and returns the waiting customer with the highest current score.
    ///
    /// Entries whose record is absent or no longer waiting are dropped along
    /// the way. `Ok(None)` means nobody is waiting. Store faults propagate
    /// unchanged; entries examined before the fault are put back.
    pub fn claim_highest(
        &self,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Option<CustomerId>, StoreError> {
        Ok(self
            .claim_highest_entry(evaluated_at)?
            .map(|entry| entry.customer_id))
    }

    /// Like [`claim_highest`](Self::claim_highest), returning the whole
    /// entry so a caller whose follow-up write fails can
    /// [`restore`](Self::restore) it.
    pub fn claim_highest_entry(
        &self,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Option<HeapEntry>, StoreError> {
        let mut heap = self.lock();
        let mut pool = BinaryHeap::new();
        let outcome = self.claim_locked(&mut heap, &mut pool, evaluated_at);
        for entry in pool.drain() {
            push_locked(&mut heap, entry);
        }
        outcome
    }

    fn claim_locked(
        &self,
        heap: &mut BinaryHeap<HeapEntry>,
        pool: &mut BinaryHeap<HeapEntry>,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Option<HeapEntry>, StoreError> {
        loop {
            loop {
                let can_beat_pool = match (heap.peek(), pool.peek()) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(top), Some(best)) => {
                        top.score.saturating_add(MAX_AGING_BONUS) >= best.score
                    }
                };
                if !can_beat_pool {
                    break;
                }
                if let Some(mut entry) = heap.pop() {
                    entry.rescore(evaluated_at);
                    pool.push(entry);
                }
            }

            let Some(candidate) = pool.pop() else {
                return Ok(None);
            };

            let record = match self.store.get_record(candidate.customer_id) {
                Ok(record) => record,
                Err(err) => {
                    pool.push(candidate);
                    return Err(err);
                }
            };

            match record {
                Some(record) if record.is_waiting() => {
                    debug!(
                        customer = %candidate.customer_id,
                        score = candidate.score,
                        examined = pool.len() + 1,
                        "claimed highest waiting customer"
                    );
                    return Ok(Some(candidate));
                }
                Some(record) => {
                    debug!(
                        customer = %candidate.customer_id,
                        status = %record.status,
                        "dropping stale entry"
                    );
                }
                None => {
                    debug!(customer = %candidate.customer_id, "dropping entry without record");
                }
            }
        }
    }

    /// Puts a claimed entry back, unchanged.
    pub fn restore(&self, entry: HeapEntry) {
        push_locked(&mut self.lock(), entry);
    }

    /// Resident ids in heap-array order (not priority order).
    pub fn snapshot(&self) -> Vec<CustomerId> {
        self.lock().iter().map(|e| e.customer_id).collect()
    }

    /// Number of resident entries, duplicates included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replaces every resident entry with the records `load` returns, scored
    /// at `evaluated_at`. Returns the new resident count.
    ///
    /// `load` runs under the heap lock, so an admit that races the rebuild
    /// lands either in the loaded records or after the replacement. On a
    /// load error the heap is left untouched.
    pub fn replace_with<F>(&self, load: F, evaluated_at: DateTime<Utc>) -> Result<usize, StoreError>
    where
        F: FnOnce() -> Result<Vec<CustomerRecord>, StoreError>,
    {
        let mut heap = self.lock();
        let records = load()?;
        heap.clear();
        for record in &records {
            push_locked(&mut heap, HeapEntry::from_record(record, evaluated_at));
        }
        Ok(heap.len())
    }
}

/// Inserts into a heap whose lock the caller already holds.
fn push_locked(heap: &mut BinaryHeap<HeapEntry>, entry: HeapEntry) {
    heap.push(entry);
}
