//! Queue service facade.
//!
//! # Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `register_customer` | Validate, score, persist as `waiting`, admit |
//! | `queue_view` | Rank waiting customers by current score, raise aging alerts |
//! | `serve_next` | Complete whoever is at the counter, move the best waiting customer there |
//! | `analytics` | Queue KPIs |
//!
//! Queue view and serve-next first check the live scheduler against the
//! store and rebuild it if it has lost its contents.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{LiveScheduler, QueueKpi, Reconciler};
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult, StoreError};
use crate::models::{
    AgingAlert, Category, CustomerId, CustomerRecord, CustomerStatus, NewCustomer, PriorityLevel,
    QueueEntry, QueueView, RegisteredCustomer, Registration, ServedCustomer, ServingSummary,
};
use crate::ranking::rank_by;
use crate::scoring;
use crate::store::RecordStore;
use crate::validation::validate_registration;

/// The scheduler as seen by the surrounding service layer.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{Duration, Utc};
/// use walkin_queue::config::QueueConfig;
/// use walkin_queue::models::Registration;
/// use walkin_queue::scheduler::QueueService;
/// use walkin_queue::store::InMemoryStore;
///
/// let service = QueueService::new(Arc::new(InMemoryStore::new()), QueueConfig::default());
/// let now = Utc::now();
/// service.start(now).unwrap();
///
/// let ana = service
///     .register_customer(Registration::new("Ana", "PWD").with_urgency(3), now)
///     .unwrap();
/// assert_eq!(ana.base_score, 11);
/// assert_eq!(ana.queue_number, "P-001");
///
/// let served = service.serve_next(now + Duration::minutes(1)).unwrap();
/// assert_eq!(served.map(|s| s.id), Some(ana.id));
/// ```
#[derive(Debug)]
pub struct QueueService<S> {
    store: Arc<S>,
    scheduler: LiveScheduler<S>,
    reconciler: Reconciler<S>,
    config: QueueConfig,
    registration_lock: Mutex<()>,
    counter_lock: Mutex<()>,
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: RecordStore> QueueService<S> {
    /// Creates a service over `store`. Call [`start`](Self::start) before use.
    pub fn new(store: Arc<S>, config: QueueConfig) -> Self {
        Self {
            scheduler: LiveScheduler::new(Arc::clone(&store)),
            reconciler: Reconciler::new(Arc::clone(&store)),
            store,
            config,
            registration_lock: Mutex::new(()),
            counter_lock: Mutex::new(()),
        }
    }

    /// Loads every waiting customer into the live scheduler.
    pub fn start(&self, evaluated_at: DateTime<Utc>) -> QueueResult<usize> {
        Ok(self
            .reconciler
            .rebuild_from_store(&self.scheduler, evaluated_at)?)
    }

    pub fn scheduler(&self) -> &LiveScheduler<S> {
        &self.scheduler
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Registers a walk-in customer and admits them to the live queue.
    ///
    /// The queue number is the category initial plus a running count,
    /// e.g. `S-004` for the fourth registration, a senior citizen.
    pub fn register_customer(
        &self,
        registration: Registration,
        arrival_time: DateTime<Utc>,
    ) -> QueueResult<RegisteredCustomer> {
        validate_registration(&registration).map_err(QueueError::InvalidRegistration)?;

        let category = Category::from(registration.category.trim());
        let base_score = scoring::base_score(
            &category,
            registration.urgency_level,
            registration.has_appointment,
        );

        let record = {
            let _guard = acquire(&self.registration_lock);
            let queue_number = queue_number(&category, self.store.count()? + 1);
            self.store.create_record(NewCustomer {
                queue_number,
                name: registration.name.trim().to_string(),
                category,
                service: registration
                    .service
                    .unwrap_or_else(|| self.config.default_service.clone()),
                urgency_level: registration.urgency_level,
                has_appointment: registration.has_appointment,
                base_score,
                arrival_time,
            })?
        };

        self.scheduler.admit(
            record.id,
            record.category.clone(),
            record.base_score,
            record.arrival_time,
            arrival_time,
        );
        info!(
            customer = %record.id,
            queue_number = %record.queue_number,
            category = %record.category,
            base_score,
            "registered customer"
        );

        Ok(RegisteredCustomer {
            id: record.id,
            queue_number: record.queue_number,
            name: record.name,
            base_score: record.base_score,
        })
    }

    /// Ranked view of the queue at `evaluated_at`.
    pub fn queue_view(&self, evaluated_at: DateTime<Utc>) -> QueueResult<QueueView> {
        self.sync(evaluated_at)?;

        let currently_serving = self
            .store
            .list_by_status(CustomerStatus::Serving)?
            .into_iter()
            .next()
            .map(|record| {
                let (score, _) = scoring::current_score_at(
                    record.base_score,
                    &record.category,
                    record.arrival_time,
                    evaluated_at,
                );
                ServingSummary {
                    id: record.id,
                    queue_number: record.queue_number,
                    name: record.name,
                    service: record.service,
                    category: record.category,
                    score,
                }
            });

        let mut waiting = self.resident_waiting_records()?;
        // Ties in the ranking keep input order: first come, first served.
        waiting.sort_by(|a, b| {
            a.arrival_time
                .cmp(&b.arrival_time)
                .then_with(|| a.id.cmp(&b.id))
        });

        let rows: Vec<QueueEntry> = waiting
            .into_iter()
            .map(|record| self.queue_entry(record, evaluated_at))
            .collect();
        let queue = rank_by(rows, |row| row.score);

        let alerts = queue
            .iter()
            .filter(|row| {
                row.category.is_regular() && row.wait_minutes >= self.config.alert_wait_minutes
            })
            .map(aging_alert)
            .collect();

        Ok(QueueView {
            evaluated_at,
            currently_serving,
            queue,
            alerts,
        })
    }

    /// Completes the current customer and calls the next one to the counter.
    ///
    /// Returns `Ok(None)` when nobody is waiting; the current customer is
    /// still completed in that case.
    pub fn serve_next(&self, evaluated_at: DateTime<Utc>) -> QueueResult<Option<ServedCustomer>> {
        let _counter = acquire(&self.counter_lock);
        self.sync(evaluated_at)?;
        self.complete_serving(evaluated_at)?;

        loop {
            let Some(entry) = self.scheduler.claim_highest_entry(evaluated_at)? else {
                debug!("no customers waiting");
                return Ok(None);
            };
            let id = entry.customer_id;

            let claimed = match self.store.compare_and_set_status(
                id,
                CustomerStatus::Waiting,
                CustomerStatus::Serving,
                None,
            ) {
                Ok(claimed) => claimed,
                Err(StoreError::NotFound(_)) => false,
                Err(err) => {
                    // The record is still waiting as far as we know.
                    self.scheduler.restore(entry);
                    return Err(err.into());
                }
            };
            if !claimed {
                warn!(customer = %id, "lost claim race; retrying");
                continue;
            }

            let record = self
                .store
                .get_record(id)?
                .ok_or(StoreError::NotFound(id))?;
            info!(
                customer = %record.id,
                queue_number = %record.queue_number,
                "now serving"
            );
            return Ok(Some(ServedCustomer {
                id: record.id,
                queue_number: record.queue_number,
                name: record.name,
            }));
        }
    }

    /// Marks every `serving` customer as `completed` at `evaluated_at`.
    ///
    /// Returns the ids that were completed.
    pub fn complete_serving(&self, evaluated_at: DateTime<Utc>) -> QueueResult<Vec<CustomerId>> {
        let mut completed = Vec::new();
        for record in self.store.list_by_status(CustomerStatus::Serving)? {
            if self.store.compare_and_set_status(
                record.id,
                CustomerStatus::Serving,
                CustomerStatus::Completed,
                Some(evaluated_at),
            )? {
                info!(customer = %record.id, "completed service");
                completed.push(record.id);
            }
        }
        Ok(completed)
    }

    /// Queue KPIs at `evaluated_at`.
    pub fn analytics(&self, evaluated_at: DateTime<Utc>) -> QueueResult<QueueKpi> {
        let records = self.store.list_all()?;
        Ok(QueueKpi::calculate(&records, evaluated_at))
    }

    fn sync(&self, evaluated_at: DateTime<Utc>) -> QueueResult<()> {
        if self.config.rebuild_on_divergence {
            self.reconciler
                .ensure_consistent(&self.scheduler, evaluated_at)?;
        }
        Ok(())
    }

    /// Waiting records for the ids resident in the scheduler, without duplicates.
    fn resident_waiting_records(&self) -> QueueResult<Vec<CustomerRecord>> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for id in self.scheduler.snapshot() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(record) = self.store.get_record(id)? {
                if record.is_waiting() {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    fn queue_entry(&self, record: CustomerRecord, evaluated_at: DateTime<Utc>) -> QueueEntry {
        let (score, wait_minutes) = scoring::current_score_at(
            record.base_score,
            &record.category,
            record.arrival_time,
            evaluated_at,
        );
        QueueEntry {
            id: record.id,
            queue_number: record.queue_number,
            name: record.name,
            category: record.category,
            service: record.service,
            urgency_level: record.urgency_level,
            score,
            level: PriorityLevel::from_score(
                score,
                self.config.high_threshold,
                self.config.medium_threshold,
            ),
            wait_minutes,
        }
    }
}

fn queue_number(category: &Category, sequence: usize) -> String {
    let initial: String = category
        .label()
        .chars()
        .take(1)
        .flat_map(char::to_uppercase)
        .collect();
    format!("{initial}-{sequence:03}")
}

fn aging_alert(row: &QueueEntry) -> AgingAlert {
    let bonus = scoring::aging_bonus(row.wait_minutes);
    AgingAlert {
        id: row.id,
        wait_minutes: row.wait_minutes,
        bonus,
        message: format!(
            "{} (Regular) - {} Minute Wait (+{} Aging Bonus)",
            row.name, row.wait_minutes, bonus
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::{Duration, TimeZone};
    use std::collections::VecDeque;

    /// What the next status write does instead of reaching the store.
    #[derive(Debug, Clone, Copy)]
    enum CasFault {
        /// Another actor completes the customer first; the write then loses.
        LoseRace,
        /// The record vanishes.
        Vanish,
        /// The store is unreachable.
        Unavailable,
    }

    #[derive(Debug, Default)]
    struct ScriptedStore {
        inner: InMemoryStore,
        faults: Mutex<VecDeque<CasFault>>,
    }

    impl ScriptedStore {
        fn fail_next(&self, fault: CasFault) {
            self.faults.lock().unwrap().push_back(fault);
        }
    }

    impl RecordStore for ScriptedStore {
        fn create_record(&self, customer: NewCustomer) -> Result<CustomerRecord, StoreError> {
            self.inner.create_record(customer)
        }

        fn get_record(&self, id: CustomerId) -> Result<Option<CustomerRecord>, StoreError> {
            self.inner.get_record(id)
        }

        fn list_by_status(
            &self,
            status: CustomerStatus,
        ) -> Result<Vec<CustomerRecord>, StoreError> {
            self.inner.list_by_status(status)
        }

        fn list_all(&self) -> Result<Vec<CustomerRecord>, StoreError> {
            self.inner.list_all()
        }

        fn count(&self) -> Result<usize, StoreError> {
            self.inner.count()
        }

        fn compare_and_set_status(
            &self,
            id: CustomerId,
            expected: CustomerStatus,
            new_status: CustomerStatus,
            completion_time: Option<DateTime<Utc>>,
        ) -> Result<bool, StoreError> {
            let fault = self.faults.lock().unwrap().pop_front();
            match fault {
                Some(CasFault::LoseRace) => {
                    self.inner.force_status(id, CustomerStatus::Completed);
                }
                Some(CasFault::Vanish) => return Err(StoreError::NotFound(id)),
                Some(CasFault::Unavailable) => {
                    return Err(StoreError::Unavailable("connection reset".into()))
                }
                None => {}
            }
            self.inner
                .compare_and_set_status(id, expected, new_status, completion_time)
        }
    }

    fn scripted_service() -> (Arc<ScriptedStore>, QueueService<ScriptedStore>) {
        let store = Arc::new(ScriptedStore::default());
        let service = QueueService::new(Arc::clone(&store), QueueConfig::default());
        service.start(t0()).unwrap();
        (store, service)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn service() -> QueueService<InMemoryStore> {
        let service = QueueService::new(Arc::new(InMemoryStore::new()), QueueConfig::default());
        service.start(t0()).unwrap();
        service
    }

    #[test]
    fn test_queue_numbers() {
        assert_eq!(queue_number(&Category::SeniorCitizen, 4), "S-004");
        assert_eq!(queue_number(&Category::Pwd, 12), "P-012");
        assert_eq!(queue_number(&Category::Other("student".into()), 1000), "S-1000");
    }

    #[test]
    fn test_register_scores_and_persists() {
        let service = service();
        let reg = Registration::new(" Ana ", "PWD")
            .with_urgency(3)
            .with_appointment(true);
        let registered = service.register_customer(reg, t0()).unwrap();

        assert_eq!(registered.base_score, 13);
        assert_eq!(registered.queue_number, "P-001");
        assert_eq!(registered.name, "Ana");

        let record = service.store().get_record(registered.id).unwrap().unwrap();
        assert_eq!(record.status, CustomerStatus::Waiting);
        assert_eq!(record.service, "N/A");
        assert_eq!(service.scheduler().snapshot(), vec![registered.id]);
    }

    #[test]
    fn test_register_rejects_invalid_input() {
        let service = service();
        let err = service
            .register_customer(Registration::new("", "Regular"), t0())
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidRegistration(ref e) if e.len() == 1));
        assert_eq!(service.store().count().unwrap(), 0);
        assert!(service.scheduler().is_empty());
    }

    #[test]
    fn test_view_levels_and_alerts() {
        let service = service();
        let regular = service
            .register_customer(Registration::new("Ben", "Regular"), t0())
            .unwrap();
        let senior = service
            .register_customer(Registration::new("Cora", "Senior Citizen").with_urgency(2), t0())
            .unwrap();

        let view = service.queue_view(t0() + Duration::minutes(12)).unwrap();
        // senior: 4 + 4 + 1 = 9, regular: 3 + 1 = 4
        assert_eq!(view.ids(), vec![senior.id, regular.id]);
        assert_eq!(view.entry(senior.id).unwrap().level, PriorityLevel::Medium);
        assert_eq!(view.entry(regular.id).unwrap().level, PriorityLevel::Low);
        assert_eq!(view.alerts.len(), 1);
        assert_eq!(view.alerts[0].id, regular.id);
        assert_eq!(
            view.alerts[0].message,
            "Ben (Regular) - 12 Minute Wait (+1 Aging Bonus)"
        );
        assert!(view.currently_serving.is_none());
    }

    #[test]
    fn test_view_ties_are_first_come_first_served() {
        let service = service();
        let first = service
            .register_customer(Registration::new("A", "Pregnant"), t0())
            .unwrap();
        let second = service
            .register_customer(Registration::new("B", "Senior Citizen"), t0() + Duration::seconds(5))
            .unwrap();

        let view = service.queue_view(t0() + Duration::minutes(1)).unwrap();
        assert_eq!(view.ids(), vec![first.id, second.id]);
    }

    #[test]
    fn test_serve_next_completes_previous() {
        let service = service();
        let a = service
            .register_customer(Registration::new("A", "PWD"), t0())
            .unwrap();
        let b = service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();

        let first = service.serve_next(t0() + Duration::minutes(1)).unwrap().unwrap();
        assert_eq!(first.id, a.id);
        let view = service.queue_view(t0() + Duration::minutes(2)).unwrap();
        assert_eq!(view.currently_serving.as_ref().map(|s| s.id), Some(a.id));
        assert_eq!(view.ids(), vec![b.id]);

        let done_at = t0() + Duration::minutes(7);
        let second = service.serve_next(done_at).unwrap().unwrap();
        assert_eq!(second.id, b.id);
        let a_record = service.store().get_record(a.id).unwrap().unwrap();
        assert_eq!(a_record.status, CustomerStatus::Completed);
        assert_eq!(a_record.completion_time, Some(done_at));

        assert!(service.serve_next(done_at).unwrap().is_none());
        let b_record = service.store().get_record(b.id).unwrap().unwrap();
        assert_eq!(b_record.status, CustomerStatus::Completed);
        assert!(service
            .store()
            .list_by_status(CustomerStatus::Serving)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_serve_next_skips_externally_claimed() {
        let service = service();
        let a = service
            .register_customer(Registration::new("A", "PWD").with_urgency(4), t0())
            .unwrap();
        let b = service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();
        // Another actor moves A to the counter behind the scheduler's back.
        service
            .store()
            .compare_and_set_status(a.id, CustomerStatus::Waiting, CustomerStatus::Serving, None)
            .unwrap();

        let served = service.serve_next(t0()).unwrap().unwrap();
        assert_eq!(served.id, b.id);
    }

    #[test]
    fn test_serve_next_retries_after_lost_race() {
        let (store, service) = scripted_service();
        let a = service
            .register_customer(Registration::new("A", "PWD"), t0())
            .unwrap();
        let b = service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();

        store.fail_next(CasFault::LoseRace);
        let served = service.serve_next(t0()).unwrap().unwrap();
        assert_eq!(served.id, b.id);

        let a_record = store.get_record(a.id).unwrap().unwrap();
        assert_eq!(a_record.status, CustomerStatus::Completed);
        let b_record = store.get_record(b.id).unwrap().unwrap();
        assert_eq!(b_record.status, CustomerStatus::Serving);
        assert!(service.serve_next(t0()).unwrap().is_none());
    }

    #[test]
    fn test_serve_next_skips_vanished_record() {
        let (store, service) = scripted_service();
        let a = service
            .register_customer(Registration::new("A", "PWD"), t0())
            .unwrap();
        let b = service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();

        store.fail_next(CasFault::Vanish);
        let served = service.serve_next(t0()).unwrap().unwrap();
        assert_eq!(served.id, b.id);
        assert!(!service.scheduler().snapshot().contains(&a.id));
    }

    #[test]
    fn test_serve_next_fault_keeps_customer_queued() {
        let (store, service) = scripted_service();
        let a = service
            .register_customer(Registration::new("A", "PWD").with_urgency(3), t0())
            .unwrap();
        let b = service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();

        store.fail_next(CasFault::Unavailable);
        let err = service.serve_next(t0()).unwrap_err();
        assert!(matches!(err, QueueError::Store(StoreError::Unavailable(_))));

        let a_record = store.get_record(a.id).unwrap().unwrap();
        assert_eq!(a_record.status, CustomerStatus::Waiting);
        assert_eq!(service.queue_view(t0()).unwrap().ids(), vec![a.id, b.id]);

        let served = service.serve_next(t0()).unwrap().unwrap();
        assert_eq!(served.id, a.id);
    }

    #[test]
    fn test_register_huge_urgency_saturates() {
        let service = service();
        let huge = service
            .register_customer(Registration::new("A", "PWD").with_urgency(i64::MAX / 2 + 1), t0())
            .unwrap();
        let small = service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();
        assert_eq!(huge.base_score, i64::MAX);

        let view = service.queue_view(t0() + Duration::minutes(40)).unwrap();
        assert_eq!(view.ids(), vec![huge.id, small.id]);
        assert_eq!(view.entry(huge.id).unwrap().score, i64::MAX);
        assert_eq!(service.serve_next(t0()).unwrap().map(|s| s.id), Some(huge.id));
    }

    #[test]
    fn test_analytics() {
        let service = service();
        service
            .register_customer(Registration::new("A", "PWD"), t0())
            .unwrap();
        service
            .register_customer(Registration::new("B", "Regular"), t0())
            .unwrap();
        service.serve_next(t0()).unwrap();
        service.serve_next(t0() + Duration::minutes(10)).unwrap();

        let kpi = service.analytics(t0() + Duration::minutes(10)).unwrap();
        assert_eq!(kpi.total_customers, 2);
        assert_eq!(kpi.completed_customers, 1);
        assert_eq!(kpi.priority_customers_served, 1);
        assert_eq!(kpi.avg_wait_minutes_rounded, 10);
        assert_eq!(kpi.current_queue_length, 0);
    }

    #[test]
    fn test_divergence_rebuild_can_be_disabled() {
        let store = Arc::new(InMemoryStore::new());
        let service = QueueService::new(
            Arc::clone(&store),
            QueueConfig::default().with_rebuild_on_divergence(false),
        );
        store
            .create_record(NewCustomer {
                queue_number: "R-001".into(),
                name: "Orphan".into(),
                category: Category::Regular,
                service: "N/A".into(),
                urgency_level: 1,
                has_appointment: false,
                base_score: 3,
                arrival_time: t0(),
            })
            .unwrap();

        assert!(service.queue_view(t0()).unwrap().queue.is_empty());
        assert!(service.serve_next(t0()).unwrap().is_none());
    }
}
