use chrono::{DateTime, Utc};

/// Classification of a detected oscillation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillationType {
    /// Dominant in-band frequency below 0.8 Hz — an inter-area electromechanical mode.
    InterArea,
    /// Dominant in-band frequency at or above 0.8 Hz — a local mode.
    Local,
    /// No oscillation detected.
    None,
}

impl std::fmt::Display for OscillationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OscillationType::InterArea => "inter-area",
            OscillationType::Local => "local",
            OscillationType::None => "none",
        };
        write!(f, "{s}")
    }
}

/// Result of one oscillation-detector pass over a window.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillationResult {
    pub detected: bool,
    pub dominant_frequency: f64,
    pub dominant_magnitude: f64,
    pub oscillation_type: OscillationType,
    pub in_band_power: f64,
    pub baseline_power: f64,
    pub threshold: f64,
    pub damping_ratio: f64,
    pub timestamp: DateTime<Utc>,
    pub band: (f64, f64),
}

impl OscillationResult {
    /// High-severity alert iff detected and weakly damped (ζ < 0.05), matching
    /// the `oscillation_alerts` tag rule in spec.md §6.
    pub fn alert_severity(&self) -> Option<&'static str> {
        if !self.detected {
            return None;
        }
        Some(if self.damping_ratio < 0.05 {
            "high"
        } else {
            "medium"
        })
    }
}
