//! Live queue scheduling.
//!
//! - [`LiveScheduler`]: heap of waiting customers with claim-time revalidation.
//! - [`Reconciler`]: rebuilds the heap from the store of record.
//! - [`QueueService`]: register, view, serve-next and analytics over both.
//! - [`QueueKpi`]: service metrics.
//!
//! # Algorithm
//!
//! The heap orders customers by the score they had when last scored. Claims
//! rescore only the entries that could still beat the current best
//! candidate, bounded by the largest possible aging bonus, and confirm the
//! winner against the store before handing it out.

mod kpi;
mod live;
mod reconcile;
mod service;

pub use kpi::QueueKpi;
pub use live::{HeapEntry, LiveScheduler};
pub use reconcile::Reconciler;
pub use service::QueueService;
