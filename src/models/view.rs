//! Read models returned to the service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, CustomerId};

/// Display band for a current score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    /// Classifies a score against the given thresholds (inclusive lower bounds).
    pub fn from_score(score: i64, high_threshold: i64, medium_threshold: i64) -> Self {
        if score >= high_threshold {
            Self::High
        } else if score >= medium_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One row of the ranked queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: CustomerId,
    pub queue_number: String,
    pub name: String,
    pub category: Category,
    pub service: String,
    pub urgency_level: i64,
    /// Current score at the evaluation instant.
    pub score: i64,
    pub level: PriorityLevel,
    pub wait_minutes: i64,
}

/// Starvation warning for a long-waiting `Regular` customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingAlert {
    pub id: CustomerId,
    pub wait_minutes: i64,
    /// Aging tier bonus currently applied.
    pub bonus: i64,
    pub message: String,
}

/// The customer at the counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingSummary {
    pub id: CustomerId,
    pub queue_number: String,
    pub name: String,
    pub service: String,
    pub category: Category,
    pub score: i64,
}

/// Display-ready state of the whole queue at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueView {
    pub evaluated_at: DateTime<Utc>,
    pub currently_serving: Option<ServingSummary>,
    /// Waiting customers, highest score first.
    pub queue: Vec<QueueEntry>,
    pub alerts: Vec<AgingAlert>,
}

impl QueueView {
    /// Ids in display order.
    pub fn ids(&self) -> Vec<CustomerId> {
        self.queue.iter().map(|e| e.id).collect()
    }

    /// Row for the given customer, if waiting.
    pub fn entry(&self, id: CustomerId) -> Option<&QueueEntry> {
        self.queue.iter().find(|e| e.id == id)
    }
}

/// Registration input after field mapping.
///
/// `urgency_level` defaults to 1 and `service` to the configured default,
/// mirroring what the intake form submits when fields are left blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default = "default_urgency")]
    pub urgency_level: i64,
    #[serde(default)]
    pub has_appointment: bool,
}

fn default_urgency() -> i64 {
    1
}

impl Registration {
    /// Creates a registration with default urgency and no appointment.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            service: None,
            urgency_level: default_urgency(),
            has_appointment: false,
        }
    }

    /// Sets the requested service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the urgency level.
    pub fn with_urgency(mut self, urgency_level: i64) -> Self {
        self.urgency_level = urgency_level;
        self
    }

    /// Marks the customer as holding an appointment.
    pub fn with_appointment(mut self, has_appointment: bool) -> Self {
        self.has_appointment = has_appointment;
        self
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredCustomer {
    pub id: CustomerId,
    pub queue_number: String,
    pub name: String,
    pub base_score: i64,
}

/// Customer moved to the counter by `serve_next`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedCustomer {
    pub id: CustomerId,
    pub queue_number: String,
    pub name: String,
}
