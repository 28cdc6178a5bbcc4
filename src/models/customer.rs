//! Customer record model.
//!
//! A customer record is the durable unit of the queue: it is created once at
//! registration, moves `waiting → serving → completed`, and is never deleted.
//!
//! # Persisted Contract
//! Field names and status values serialize exactly as other collaborators
//! read them (`initial_priority_score`, `arrival_timestamp`, `"waiting"`, ...).
//! Renaming a field here is a breaking change for every reader of the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, immutable customer identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Customer category.
///
/// The set is open: categories the scheduler has no special rules for are
/// kept verbatim in [`Category::Other`] and score like `Regular`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Person with disability.
    Pwd,
    SeniorCitizen,
    Pregnant,
    Regular,
    /// Any category without dedicated scoring rules.
    Other(String),
}

impl Category {
    /// Stored label, e.g. `"Senior Citizen"`.
    pub fn label(&self) -> &str {
        match self {
            Self::Pwd => "PWD",
            Self::SeniorCitizen => "Senior Citizen",
            Self::Pregnant => "Pregnant",
            Self::Regular => "Regular",
            Self::Other(label) => label,
        }
    }

    /// Whether this is the `Regular` category (eligible for the starvation bonus).
    pub fn is_regular(&self) -> bool {
        matches!(self, Self::Regular)
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        match label {
            "PWD" => Self::Pwd,
            "Senior Citizen" => Self::SeniorCitizen,
            "Pregnant" => Self::Pregnant,
            "Regular" => Self::Regular,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle status of a customer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Waiting,
    Serving,
    Completed,
}

impl CustomerStatus {
    /// Whether `self → next` is a legal forward transition.
    pub fn can_transition_to(self, next: CustomerStatus) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::Serving) | (Self::Serving, Self::Completed)
        )
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Waiting => "waiting",
            Self::Serving => "serving",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Durable customer record as held by the store of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    /// Human-facing ticket, e.g. `"P-001"`.
    pub queue_number: String,
    pub name: String,
    pub category: Category,
    pub service: String,
    #[serde(rename = "urgency")]
    pub urgency_level: i64,
    pub has_appointment: bool,
    /// Registration-time score. Immutable.
    #[serde(rename = "initial_priority_score")]
    pub base_score: i64,
    pub status: CustomerStatus,
    #[serde(rename = "arrival_timestamp")]
    pub arrival_time: DateTime<Utc>,
    /// `None` until the record reaches `completed`.
    #[serde(rename = "completion_timestamp")]
    pub completion_time: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    /// Whether the record is still waiting to be served.
    pub fn is_waiting(&self) -> bool {
        self.status == CustomerStatus::Waiting
    }
}

/// Fields supplied when creating a record. The store assigns the id and
/// sets the status to `waiting`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub queue_number: String,
    pub name: String,
    pub category: Category,
    pub service: String,
    pub urgency_level: i64,
    pub has_appointment: bool,
    pub base_score: i64,
    pub arrival_time: DateTime<Utc>,
}

impl NewCustomer {
    /// Materializes the record under the given id.
    pub fn into_record(self, id: CustomerId) -> CustomerRecord {
        CustomerRecord {
            id,
            queue_number: self.queue_number,
            name: self.name,
            category: self.category,
            service: self.service,
            urgency_level: self.urgency_level,
            has_appointment: self.has_appointment,
            base_score: self.base_score,
            status: CustomerStatus::Waiting,
            arrival_time: self.arrival_time,
            completion_time: None,
        }
    }
}
