use serde::{Deserialize, Serialize};

/// The physical quantity a signal represents. Drives severity/classification
/// thresholds in the fault detector and warning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Frequency,
    Voltage,
    Current,
    Power,
    Rocof,
    Other,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalType::Frequency => "frequency",
            SignalType::Voltage => "voltage",
            SignalType::Current => "current",
            SignalType::Power => "power",
            SignalType::Rocof => "rocof",
            SignalType::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Static configuration for a monitored signal.
///
/// `threshold_ratio` belongs to the legacy pre/post-window alerting proxy
/// (`(value - base) / base`), which is an external collaborator (spec §1,
/// §9). It is kept here as a field because it is part of the documented
/// data model, but nothing in this workspace's core reads it — the warning
/// engine (C8) uses [`crate::ThresholdConfig`]'s absolute min/max bounds
/// instead, and the two paths are intentionally independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub signal_id: String,
    pub signal_type: SignalType,
    pub base: Option<f64>,
    pub threshold_ratio: Option<f64>,
}

impl SignalConfig {
    pub fn new(signal_id: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            signal_id: signal_id.into(),
            signal_type,
            base: None,
            threshold_ratio: None,
        }
    }

    pub fn with_base(mut self, base: f64) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_threshold_ratio(mut self, ratio: f64) -> Self {
        self.threshold_ratio = Some(ratio);
        self
    }
}
