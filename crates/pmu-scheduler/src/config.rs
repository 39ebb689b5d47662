use pmu_types::SignalType;

/// Per-signal DSP parameters the scheduler needs that live outside the core
/// data model (spec.md §3 scopes `SignalConfig` to id/type/base/ratio only).
#[derive(Debug, Clone)]
pub struct SignalAnalysisConfig {
    pub signal_id: String,
    pub signal_type: SignalType,
    pub sample_rate_hz: f64,
    pub oscillation_band_hz: (f64, f64),
    pub fundamental_hz: Option<f64>,
}

impl SignalAnalysisConfig {
    pub fn new(signal_id: impl Into<String>, signal_type: SignalType, sample_rate_hz: f64) -> Self {
        Self {
            signal_id: signal_id.into(),
            signal_type,
            sample_rate_hz,
            oscillation_band_hz: (0.1, 2.0),
            fundamental_hz: None,
        }
    }

    pub fn with_oscillation_band(mut self, low_hz: f64, high_hz: f64) -> Self {
        self.oscillation_band_hz = (low_hz, high_hz);
        self
    }

    pub fn with_fundamental(mut self, hz: f64) -> Self {
        self.fundamental_hz = Some(hz);
        self
    }
}
