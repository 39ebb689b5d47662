//! Process configuration (spec.md §6, ambient layering per
//! `palm-daemon::config::DaemonConfig`).

use std::collections::HashMap;

use pmu_types::{SignalConfig, ThresholdConfig};
use serde::{Deserialize, Serialize};

fn default_tsdb_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tsdb_port() -> u16 {
    8086
}

fn default_source_db() -> String {
    "pmu_data".to_string()
}

fn default_analysis_db() -> String {
    "pmu_analysis".to_string()
}

fn default_warning_db() -> String {
    "pmu_warnings".to_string()
}

fn default_analysis_interval_s() -> f64 {
    5.0
}

fn default_sample_rate_hz() -> f64 {
    1.0
}

fn default_drain_interval_s() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Store endpoint (spec.md §6, `tsdb_host`/`tsdb_port`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsdbConfig {
    #[serde(default = "default_tsdb_host")]
    pub host: String,
    #[serde(default = "default_tsdb_port")]
    pub port: u16,
}

impl Default for TsdbConfig {
    fn default() -> Self {
        Self {
            host: default_tsdb_host(),
            port: default_tsdb_port(),
        }
    }
}

impl TsdbConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level process configuration (spec.md §6 "Configuration parameters").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmuDaemonConfig {
    #[serde(default)]
    pub tsdb: TsdbConfig,
    #[serde(default = "default_source_db")]
    pub source_db: String,
    #[serde(default = "default_analysis_db")]
    pub analysis_db: String,
    #[serde(default = "default_warning_db")]
    pub warning_db: String,
    #[serde(default)]
    pub signals: HashMap<String, SignalConfig>,
    #[serde(default = "default_analysis_interval_s")]
    pub analysis_interval_s: f64,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: f64,
    #[serde(default = "default_drain_interval_s")]
    pub warning_drain_interval_s: f64,
    #[serde(default)]
    pub threshold_list: Vec<ThresholdConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PmuDaemonConfig {
    fn default() -> Self {
        Self {
            tsdb: TsdbConfig::default(),
            source_db: default_source_db(),
            analysis_db: default_analysis_db(),
            warning_db: default_warning_db(),
            signals: HashMap::new(),
            analysis_interval_s: default_analysis_interval_s(),
            sample_rate_hz: default_sample_rate_hz(),
            warning_drain_interval_s: default_drain_interval_s(),
            threshold_list: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PmuDaemonConfig {
    /// Layers default → optional file → `PMU_`-prefixed environment
    /// variables, exactly as `palm-daemon::config::DaemonConfig::load`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::Config::try_from(&PmuDaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PMU")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// `threshold_list` if configured explicitly, otherwise one
    /// [`ThresholdConfig`] per signal that carries both `base` and
    /// `threshold_ratio` (spec.md §6: "derived from signals").
    pub fn effective_thresholds(&self) -> Vec<ThresholdConfig> {
        if !self.threshold_list.is_empty() {
            return self.threshold_list.clone();
        }

        self.signals
            .values()
            .filter_map(|signal| {
                let base = signal.base?;
                let ratio = signal.threshold_ratio?;
                let mut cfg = ThresholdConfig::new(signal.signal_id.clone(), signal.signal_type);
                cfg.warning_min = Some(base * (1.0 - ratio));
                cfg.warning_max = Some(base * (1.0 + ratio));
                Some(cfg)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmu_types::SignalType;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = PmuDaemonConfig::default();
        assert_eq!(cfg.tsdb.base_url(), "http://127.0.0.1:8086");
        assert_eq!(cfg.source_db, "pmu_data");
        assert_eq!(cfg.analysis_db, "pmu_analysis");
        assert_eq!(cfg.warning_db, "pmu_warnings");
        assert_eq!(cfg.analysis_interval_s, 5.0);
        assert_eq!(cfg.sample_rate_hz, 1.0);
    }

    #[test]
    fn effective_thresholds_falls_back_to_derived_bounds() {
        let mut cfg = PmuDaemonConfig::default();
        cfg.signals.insert(
            "F1".to_string(),
            SignalConfig::new("F1", SignalType::Frequency).with_base(60.0).with_threshold_ratio(0.01),
        );
        let thresholds = cfg.effective_thresholds();
        assert_eq!(thresholds.len(), 1);
        assert_eq!(thresholds[0].warning_min, Some(59.4));
        assert_eq!(thresholds[0].warning_max, Some(60.6));
    }

    #[test]
    fn explicit_threshold_list_wins_over_derivation() {
        let mut cfg = PmuDaemonConfig::default();
        cfg.signals.insert(
            "F1".to_string(),
            SignalConfig::new("F1", SignalType::Frequency).with_base(60.0).with_threshold_ratio(0.01),
        );
        cfg.threshold_list = vec![ThresholdConfig::new("F1", SignalType::Frequency)];
        let thresholds = cfg.effective_thresholds();
        assert_eq!(thresholds.len(), 1);
        assert_eq!(thresholds[0].warning_min, None);
    }
}
