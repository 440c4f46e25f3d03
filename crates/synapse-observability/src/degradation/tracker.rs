//! Every period during which sync ran degraded: component, failure, attempt
//! count, start time and recovery status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Active,
    Recovered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedDegradation {
    pub component: String,
    pub failure: String,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub recovery_status: RecoveryStatus,
    pub recovered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct DegradationTracker {
    events: Vec<TrackedDegradation>,
}

impl DegradationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed attempt. Consecutive failures of the same component
    /// extend the active entry instead of opening a new one.
    pub fn record(&mut self, component: &str, failure: &str, attempt: u32) {
        if let Some(active) = self.active_mut(component) {
            active.failure = failure.to_string();
            active.attempts = attempt;
            return;
        }
        self.events.push(TrackedDegradation {
            component: component.to_string(),
            failure: failure.to_string(),
            attempts: attempt,
            started_at: Utc::now(),
            recovery_status: RecoveryStatus::Active,
            recovered_at: None,
        });
    }

    /// Mark a component as recovered. Returns whether it was degraded.
    pub fn mark_recovered(&mut self, component: &str) -> bool {
        match self.active_mut(component) {
            Some(active) => {
                active.recovery_status = RecoveryStatus::Recovered;
                active.recovered_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub fn events(&self) -> &[TrackedDegradation] {
        &self.events
    }

    pub fn active_degradations(&self) -> Vec<&TrackedDegradation> {
        self.events
            .iter()
            .filter(|t| t.recovery_status == RecoveryStatus::Active)
            .collect()
    }

    fn active_mut(&mut self, component: &str) -> Option<&mut TrackedDegradation> {
        self.events
            .iter_mut()
            .rev()
            .find(|t| t.component == component && t.recovery_status == RecoveryStatus::Active)
    }
}
