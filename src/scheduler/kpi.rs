//! Queue performance indicators.
//!
//! Computes service metrics from the full set of customer records.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total Customers | Records ever registered |
//! | Queue Length | Records currently waiting |
//! | Average Wait | Mean(completion − arrival) over completed records that carry a completion time, minutes |
//! | Priority Served | Completed records outside the `Regular` category |
//! | Longest Current Wait | Largest wait among waiting records at the evaluation instant |
//!
//! Completed records without a completion time are counted as completed but
//! left out of the average wait, both numerator and denominator. Dividing by
//! every completed record would count them as zero-minute waits.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, CustomerRecord, CustomerStatus};
use crate::scoring;

/// Queue performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueKpi {
    pub total_customers: usize,
    pub current_queue_length: usize,
    pub completed_customers: usize,
    /// Completed customers in any category other than `Regular`.
    pub priority_customers_served: usize,
    /// Mean arrival-to-completion time (minutes) over timed completions.
    pub avg_wait_minutes: f64,
    /// `avg_wait_minutes` rounded to the nearest minute.
    pub avg_wait_minutes_rounded: i64,
    /// Longest wait among customers still waiting (minutes).
    pub longest_current_wait_minutes: i64,
    /// Completed customers per category label.
    pub served_by_category: HashMap<String, usize>,
}

impl QueueKpi {
    /// Computes KPIs from every record in the store.
    ///
    /// # Arguments
    /// * `records` - All customer records.
    /// * `evaluated_at` - Instant used for waits of customers still waiting.
    pub fn calculate(records: &[CustomerRecord], evaluated_at: DateTime<Utc>) -> Self {
        let mut current_queue_length = 0;
        let mut completed_customers = 0;
        let mut priority_customers_served = 0;
        let mut total_wait_seconds: i64 = 0;
        let mut timed_completions: usize = 0;
        let mut longest_current_wait_minutes = 0;
        let mut served_by_category: HashMap<String, usize> = HashMap::new();

        for record in records {
            match record.status {
                CustomerStatus::Waiting => {
                    current_queue_length += 1;
                    let wait = scoring::wait_minutes(record.arrival_time, evaluated_at);
                    longest_current_wait_minutes = longest_current_wait_minutes.max(wait);
                }
                CustomerStatus::Serving => {}
                CustomerStatus::Completed => {
                    completed_customers += 1;
                    if record.category != Category::Regular {
                        priority_customers_served += 1;
                    }
                    *served_by_category
                        .entry(record.category.label().to_string())
                        .or_insert(0) += 1;

                    // Records completed without a timestamp carry no wait data.
                    if let Some(completed_at) = record.completion_time {
                        total_wait_seconds += (completed_at - record.arrival_time).num_seconds();
                        timed_completions += 1;
                    }
                }
            }
        }

        let avg_wait_minutes = if timed_completions == 0 {
            0.0
        } else {
            total_wait_seconds as f64 / 60.0 / timed_completions as f64
        };

        Self {
            total_customers: records.len(),
            current_queue_length,
            completed_customers,
            priority_customers_served,
            avg_wait_minutes,
            avg_wait_minutes_rounded: avg_wait_minutes.round() as i64,
            longest_current_wait_minutes,
            served_by_category,
        }
    }
}
