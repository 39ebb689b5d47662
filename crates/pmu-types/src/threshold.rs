use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::signal::SignalType;

fn default_trigger_count() -> u32 {
    3
}

fn default_trigger_window_s() -> f64 {
    5.0
}

fn default_recovery_count() -> u32 {
    2
}

fn default_recovery_window_s() -> f64 {
    3.0
}

fn default_min_event_duration_s() -> f64 {
    1.0
}

/// Real-time threshold configuration for one signal (C8's input).
///
/// Any bound may be absent. Durations are stored in seconds for easy
/// (de)serialization from config files / env vars, and exposed as
/// [`Duration`] via the `*_window`/`*_duration` accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub signal_id: String,
    pub signal_type: SignalType,
    pub warning_min: Option<f64>,
    pub warning_max: Option<f64>,
    pub critical_min: Option<f64>,
    pub critical_max: Option<f64>,

    #[serde(default = "default_trigger_count")]
    pub trigger_count: u32,
    #[serde(default = "default_trigger_window_s")]
    pub trigger_window_s: f64,
    #[serde(default = "default_recovery_count")]
    pub recovery_count: u32,
    #[serde(default = "default_recovery_window_s")]
    pub recovery_window_s: f64,
    #[serde(default = "default_min_event_duration_s")]
    pub min_event_duration_s: f64,
}

impl ThresholdConfig {
    pub fn new(signal_id: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            signal_id: signal_id.into(),
            signal_type,
            warning_min: None,
            warning_max: None,
            critical_min: None,
            critical_max: None,
            trigger_count: default_trigger_count(),
            trigger_window_s: default_trigger_window_s(),
            recovery_count: default_recovery_count(),
            recovery_window_s: default_recovery_window_s(),
            min_event_duration_s: default_min_event_duration_s(),
        }
    }

    pub fn trigger_window(&self) -> Duration {
        Duration::from_secs_f64(self.trigger_window_s.max(0.0))
    }

    pub fn recovery_window(&self) -> Duration {
        Duration::from_secs_f64(self.recovery_window_s.max(0.0))
    }

    pub fn min_event_duration(&self) -> Duration {
        Duration::from_secs_f64(self.min_event_duration_s.max(0.0))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.warning_min.is_none()
            && self.warning_max.is_none()
            && self.critical_min.is_none()
            && self.critical_max.is_none()
        {
            return Err(ConfigError::NoBoundsConfigured(self.signal_id.clone()));
        }
        for bound in [
            self.warning_min,
            self.warning_max,
            self.critical_min,
            self.critical_max,
        ]
        .into_iter()
        .flatten()
        {
            if !bound.is_finite() {
                return Err(ConfigError::NonFiniteBound(bound));
            }
        }
        if self.trigger_count == 0 || self.recovery_count == 0 {
            return Err(ConfigError::InvalidCount);
        }
        Ok(())
    }
}
