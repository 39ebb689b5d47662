use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signal::SignalType;

/// Severity of a warning event. CRITICAL dominates WARNING when both bounds
/// are crossed (spec.md §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventSeverity::Info => "INFO",
            EventSeverity::Warning => "WARNING",
            EventSeverity::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of a warning event (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventState {
    Active,
    Recovered,
    Acknowledged,
}

impl std::fmt::Display for EventState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventState::Active => "ACTIVE",
            EventState::Recovered => "RECOVERED",
            EventState::Acknowledged => "ACKNOWLEDGED",
        };
        write!(f, "{s}")
    }
}

/// Which bound of a [`crate::ThresholdConfig`] a violation crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    Min,
    Max,
}

impl std::fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThresholdKind::Min => "min",
            ThresholdKind::Max => "max",
        };
        write!(f, "{s}")
    }
}

/// A threshold-violation event tracked and persisted by the warning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WarningEvent {
    pub event_id: String,
    pub signal_id: String,
    pub signal_type: SignalType,
    pub severity: EventSeverity,
    pub state: EventState,
    pub threshold_type: ThresholdKind,
    pub threshold_value: f64,
    pub trigger_value: f64,
    pub first_trigger_time: DateTime<Utc>,
    pub event_start_time: DateTime<Utc>,
    pub event_end_time: Option<DateTime<Utc>>,
    pub duration_s: Option<f64>,
    pub trigger_count: u32,
    pub max_deviation: f64,
    pub values_during_event: Vec<f64>,
    pub message: String,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl WarningEvent {
    /// `event_id` is `{signal_id}_{unix_seconds(first_trigger_time)}`
    /// (spec.md §4.7) — unique and stable for a given
    /// `(signal_id, first_trigger_time)`.
    pub fn make_id(signal_id: &str, first_trigger_time: DateTime<Utc>) -> String {
        format!("{signal_id}_{}", first_trigger_time.timestamp())
    }

    pub fn acknowledge(&mut self, user: impl Into<String>, at: DateTime<Utc>) {
        self.acknowledged = true;
        self.acknowledged_by = Some(user.into());
        self.acknowledged_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_is_stable_for_same_inputs() {
        let t = Utc::now();
        assert_eq!(
            WarningEvent::make_id("F1", t),
            WarningEvent::make_id("F1", t)
        );
    }

    #[test]
    fn critical_dominates_warning_in_ordering() {
        assert!(EventSeverity::Critical > EventSeverity::Warning);
        assert!(EventSeverity::Warning > EventSeverity::Info);
    }
}
