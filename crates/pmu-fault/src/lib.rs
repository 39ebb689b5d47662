//! Fault Detector (C6, spec.md §4.5): stateful per-signal sag/swell/
//! over/undercurrent/frequency-deviation/transient classification.
//!
//! State is held per `signal_id` in a [`DashMap`], mirroring the per-entity
//! lock shape used by [`pmu_buffer::RingBufferStore`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use pmu_types::{FaultResult, FaultSeverity, SignalType};

/// Default size of the baseline-deviation history (spec.md §4.5).
pub const DEFAULT_BASELINE_CAPACITY: usize = 100;
const BASELINE_WARMUP: usize = 10;
const VOLTAGE_CURRENT_RATIO_THRESHOLD: f64 = 0.05;
const FREQUENCY_DEVIATION_THRESHOLD_HZ: f64 = 0.1;
const TRANSIENT_RATE_THRESHOLD: f64 = 0.5;

struct SignalState {
    baseline_history: VecDeque<f64>,
    capacity: usize,
    last_value: Option<f64>,
    fault_active: bool,
    fault_start_time: Option<DateTime<Utc>>,
}

impl SignalState {
    fn new(capacity: usize) -> Self {
        Self {
            baseline_history: VecDeque::with_capacity(capacity),
            capacity,
            last_value: None,
            fault_active: false,
            fault_start_time: None,
        }
    }

    fn push(&mut self, value: f64) {
        if self.baseline_history.len() == self.capacity {
            self.baseline_history.pop_front();
        }
        self.baseline_history.push_back(value);
    }

    fn median(&self) -> f64 {
        let mut sorted: Vec<f64> = self.baseline_history.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        if n == 0 {
            0.0
        } else if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        }
    }
}

/// Per-signal stateful fault classifier.
pub struct FaultDetector {
    capacity: usize,
    states: DashMap<String, Mutex<SignalState>>,
}

impl FaultDetector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            states: DashMap::new(),
        }
    }

    /// Classify one sample. `baseline_override` takes precedence over the
    /// deque-derived median when `Some`.
    pub fn check(
        &self,
        signal_id: &str,
        signal_type: SignalType,
        value: f64,
        timestamp: DateTime<Utc>,
        baseline_override: Option<f64>,
    ) -> FaultResult {
        let entry = self
            .states
            .entry(signal_id.to_string())
            .or_insert_with(|| Mutex::new(SignalState::new(self.capacity)));
        let mut state = entry.lock();
        state.push(value);

        let baseline = match baseline_override {
            Some(b) => b,
            None if state.baseline_history.len() >= BASELINE_WARMUP => state.median(),
            None => return FaultResult::building_baseline(signal_type, value, timestamp),
        };

        let deviation = value - baseline;
        let deviation_ratio = if baseline == 0.0 { 0.0 } else { (deviation / baseline).abs() };
        let rate_of_change = state
            .last_value
            .map(|last| if baseline == 0.0 { 0.0 } else { (value - last).abs() / baseline.abs() });

        let mut fault_type = classify(signal_type, value, baseline, deviation, deviation_ratio);
        let mut severity = severity_for(signal_type, deviation, deviation_ratio);

        if let Some(roc) = rate_of_change {
            if roc > TRANSIENT_RATE_THRESHOLD {
                fault_type = Some(match fault_type {
                    Some(primary) => format!("{primary}_transient"),
                    None => "transient".to_string(),
                });
                if severity < FaultSeverity::High {
                    severity = FaultSeverity::High;
                }
            }
        }

        let detected = fault_type.is_some();
        if detected && !state.fault_active {
            state.fault_start_time = Some(timestamp);
        } else if !detected && state.fault_active {
            state.fault_start_time = None;
        }
        state.fault_active = detected;
        state.last_value = Some(value);

        let message = match &fault_type {
            Some(ft) => format!("{ft} on {signal_id}: value={value:.4} baseline={baseline:.4}"),
            None => "Normal".to_string(),
        };

        FaultResult {
            detected,
            fault_type,
            signal_type,
            value,
            baseline,
            deviation,
            deviation_ratio,
            rate_of_change,
            severity,
            active: detected,
            timestamp,
            message,
        }
    }

    pub fn fault_start_time(&self, signal_id: &str) -> Option<DateTime<Utc>> {
        self.states.get(signal_id).and_then(|s| s.lock().fault_start_time)
    }
}

impl Default for FaultDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_CAPACITY)
    }
}

fn classify(
    signal_type: SignalType,
    value: f64,
    baseline: f64,
    deviation: f64,
    deviation_ratio: f64,
) -> Option<String> {
    match signal_type {
        SignalType::Voltage if deviation_ratio > VOLTAGE_CURRENT_RATIO_THRESHOLD => {
            Some(if value > baseline { "voltage_swell" } else { "voltage_sag" }.to_string())
        }
        SignalType::Current if deviation_ratio > VOLTAGE_CURRENT_RATIO_THRESHOLD => {
            Some(if value > baseline { "overcurrent" } else { "undercurrent" }.to_string())
        }
        SignalType::Frequency if deviation.abs() > FREQUENCY_DEVIATION_THRESHOLD_HZ => {
            Some("frequency_deviation".to_string())
        }
        _ => None,
    }
}

fn severity_for(signal_type: SignalType, deviation: f64, deviation_ratio: f64) -> FaultSeverity {
    match signal_type {
        SignalType::Frequency => {
            let d = deviation.abs();
            if d > 0.5 {
                FaultSeverity::Critical
            } else if d > 0.3 {
                FaultSeverity::High
            } else if d > 0.15 {
                FaultSeverity::Medium
            } else {
                FaultSeverity::Low
            }
        }
        _ => {
            if deviation_ratio > 0.20 {
                FaultSeverity::Critical
            } else if deviation_ratio > 0.10 {
                FaultSeverity::High
            } else if deviation_ratio > 0.05 {
                FaultSeverity::Medium
            } else {
                FaultSeverity::Low
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(i: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(i, 0).unwrap()
    }

    fn warm_up(detector: &FaultDetector, signal_id: &str, signal_type: SignalType, value: f64) {
        for i in 0..BASELINE_WARMUP {
            detector.check(signal_id, signal_type, value, ts(i as i64), None);
        }
    }

    #[test]
    fn reports_building_baseline_before_warmup() {
        let detector = FaultDetector::default();
        let r = detector.check("V1", SignalType::Voltage, 120.0, ts(0), None);
        assert!(!r.detected);
        assert_eq!(r.message, "Building baseline");
    }

    #[test]
    fn voltage_swell_detected_above_five_percent_deviation() {
        let detector = FaultDetector::default();
        warm_up(&detector, "V1", SignalType::Voltage, 120.0);
        let r = detector.check("V1", SignalType::Voltage, 130.0, ts(100), None);
        assert!(r.detected);
        assert_eq!(r.fault_type.as_deref(), Some("voltage_swell"));
    }

    #[test]
    fn voltage_sag_detected_below_baseline() {
        let detector = FaultDetector::default();
        warm_up(&detector, "V1", SignalType::Voltage, 120.0);
        let r = detector.check("V1", SignalType::Voltage, 110.0, ts(100), None);
        assert_eq!(r.fault_type.as_deref(), Some("voltage_sag"));
    }

    #[test]
    fn frequency_deviation_uses_absolute_hz_threshold() {
        let detector = FaultDetector::default();
        warm_up(&detector, "F1", SignalType::Frequency, 60.0);
        let r = detector.check("F1", SignalType::Frequency, 60.2, ts(100), None);
        assert_eq!(r.fault_type.as_deref(), Some("frequency_deviation"));
        assert_eq!(r.severity, FaultSeverity::Medium);
    }

    #[test]
    fn transient_composes_with_existing_fault_and_forces_high_severity() {
        let detector = FaultDetector::default();
        warm_up(&detector, "V1", SignalType::Voltage, 120.0);
        // deviation_ratio just over 0.05 keeps severity at medium absent the
        // transient kick; a same-baseline jump of more than 50% triggers it.
        let r = detector.check("V1", SignalType::Voltage, 190.0, ts(100), None);
        assert_eq!(r.fault_type.as_deref(), Some("voltage_swell_transient"));
        assert!(r.severity >= FaultSeverity::High);
    }

    #[test]
    fn zero_baseline_yields_zero_deviation_ratio() {
        let detector = FaultDetector::default();
        warm_up(&detector, "P1", SignalType::Power, 0.0);
        let r = detector.check("P1", SignalType::Power, 5.0, ts(100), None);
        assert_eq!(r.deviation_ratio, 0.0);
    }

    #[test]
    fn fault_start_time_is_recorded_on_false_to_true_transition() {
        let detector = FaultDetector::default();
        warm_up(&detector, "V1", SignalType::Voltage, 120.0);
        assert!(detector.fault_start_time("V1").is_none());
        detector.check("V1", SignalType::Voltage, 130.0, ts(100), None);
        assert_eq!(detector.fault_start_time("V1"), Some(ts(100)));
        detector.check("V1", SignalType::Voltage, 120.0, ts(101), None);
        assert!(detector.fault_start_time("V1").is_none());
    }

    #[test]
    fn explicit_baseline_override_skips_warmup() {
        let detector = FaultDetector::default();
        let r = detector.check("V1", SignalType::Voltage, 130.0, ts(0), Some(120.0));
        assert!(r.detected);
    }
}
