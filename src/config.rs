//! Queue service configuration.
//!
//! [`QueueConfig`] holds the display and recovery knobs of the service.
//! Scoring constants are fixed in [`crate::scoring`] and are not configurable:
//! persisted base scores must stay comparable across restarts.

use serde::{Deserialize, Serialize};

/// Configuration for [`QueueService`](crate::scheduler::QueueService).
///
/// # Defaults
///
/// ```
/// use walkin_queue::config::QueueConfig;
///
/// let config = QueueConfig::default();
/// assert_eq!(config.high_threshold, 12);
/// assert_eq!(config.medium_threshold, 8);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use walkin_queue::config::QueueConfig;
///
/// let config = QueueConfig::default()
///     .with_level_thresholds(15, 10)
///     .with_alert_wait_minutes(15);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Lowest current score shown as `High`.
    pub high_threshold: i64,

    /// Lowest current score shown as `Medium`. Anything below is `Low`.
    pub medium_threshold: i64,

    /// Wait (minutes) after which a `Regular` customer raises an aging alert.
    pub alert_wait_minutes: i64,

    /// Rebuild the live scheduler from the store when it is found empty
    /// while the store still has waiting customers.
    pub rebuild_on_divergence: bool,

    /// Service recorded when the registration names none.
    pub default_service: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            high_threshold: 12,
            medium_threshold: 8,
            alert_wait_minutes: 10,
            rebuild_on_divergence: true,
            default_service: "N/A".to_string(),
        }
    }
}

impl QueueConfig {
    /// Sets the `High` and `Medium` lower bounds.
    pub fn with_level_thresholds(mut self, high: i64, medium: i64) -> Self {
        self.high_threshold = high;
        self.medium_threshold = medium;
        self
    }

    /// Sets the aging alert threshold.
    pub fn with_alert_wait_minutes(mut self, minutes: i64) -> Self {
        self.alert_wait_minutes = minutes;
        self
    }

    /// Enables or disables divergence-triggered rebuilds.
    pub fn with_rebuild_on_divergence(mut self, enabled: bool) -> Self {
        self.rebuild_on_divergence = enabled;
        self
    }

    /// Sets the default service label.
    pub fn with_default_service(mut self, service: impl Into<String>) -> Self {
        self.default_service = service.into();
        self
    }
}
