use chrono::{DateTime, Utc};

use crate::signal::SignalType;

/// Severity of a detected fault. A transient always forces at least `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaultSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for FaultSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FaultSeverity::Low => "low",
            FaultSeverity::Medium => "medium",
            FaultSeverity::High => "high",
            FaultSeverity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Result of one per-sample fault-detector classification.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultResult {
    pub detected: bool,
    pub fault_type: Option<String>,
    pub signal_type: SignalType,
    pub value: f64,
    pub baseline: f64,
    pub deviation: f64,
    pub deviation_ratio: f64,
    pub rate_of_change: Option<f64>,
    pub severity: FaultSeverity,
    pub active: bool,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl FaultResult {
    /// A result for a sample that didn't clear baseline warmup yet.
    pub fn building_baseline(signal_type: SignalType, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            detected: false,
            fault_type: None,
            signal_type,
            value,
            baseline: value,
            deviation: 0.0,
            deviation_ratio: 0.0,
            rate_of_change: None,
            severity: FaultSeverity::Low,
            active: false,
            timestamp,
            message: "Building baseline".to_string(),
        }
    }
}
