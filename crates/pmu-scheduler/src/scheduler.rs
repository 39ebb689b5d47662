use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pmu_buffer::RingBufferStore;
use pmu_dsp::{FftAnalyzer, OscillationDetector, SnrEstimator};
use pmu_fault::FaultDetector;
use pmu_tsdb::TimeSeriesStore;

use crate::config::SignalAnalysisConfig;
use crate::points;

/// Default cycle period `T_analysis` (spec.md §4.6).
pub const DEFAULT_ANALYSIS_INTERVAL: Duration = Duration::from_secs(5);

const PULL_LIMIT: usize = 256;
const MIN_SAMPLES_TO_PROCEED: usize = 10;
const FFT_MIN_SAMPLES: usize = 64;
const OSCILLATION_SNR_MIN_SAMPLES: usize = 128;

/// Periodic per-signal fan-out across C3-C6.
///
/// Each signal's analysis is isolated: a pull/analyze/write failure for one
/// signal is logged and the cycle continues with the rest (spec.md §4.6
/// failure policy).
pub struct AnalysisScheduler {
    configs: Vec<SignalAnalysisConfig>,
    buffer: RingBufferStore,
    fault: FaultDetector,
    source: Arc<dyn TimeSeriesStore>,
    source_db: String,
    analysis_db: String,
    running: AtomicBool,
}

impl AnalysisScheduler {
    pub fn new(
        configs: Vec<SignalAnalysisConfig>,
        source: Arc<dyn TimeSeriesStore>,
        source_db: impl Into<String>,
        analysis_db: impl Into<String>,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            configs,
            buffer: RingBufferStore::new(buffer_capacity),
            fault: FaultDetector::new(pmu_fault::DEFAULT_BASELINE_CAPACITY),
            source,
            source_db: source_db.into(),
            analysis_db: analysis_db.into(),
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the periodic loop, modeled on the scheduler/reconciler shape
    /// used elsewhere in this workspace: `tokio::time::interval` plus a
    /// `running` flag checked between ticks.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.run_cycle().await;
            }
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run one full cycle over every configured signal. Public so callers
    /// (and tests) can drive a cycle synchronously without the interval
    /// loop.
    pub async fn run_cycle(&self) {
        for cfg in &self.configs {
            self.analyze_signal(cfg).await;
        }
    }

    async fn analyze_signal(&self, cfg: &SignalAnalysisConfig) {
        let samples = match self
            .source
            .read_recent_samples(&self.source_db, &cfg.signal_id, PULL_LIMIT)
            .await
        {
            Ok(samples) => samples,
            Err(e) => {
                tracing::error!(signal_id = %cfg.signal_id, error = %e, "failed to pull samples");
                return;
            }
        };

        if samples.len() < MIN_SAMPLES_TO_PROCEED {
            return;
        }

        for sample in &samples {
            self.buffer.append(&cfg.signal_id, sample.timestamp, sample.value);
        }

        let window = self.buffer.snapshot(&cfg.signal_id);
        let values: Vec<f64> = window.iter().map(|v| v.value).collect();
        let now = window.last().map(|v| v.timestamp).unwrap_or_else(Utc::now);

        let mut out_points = Vec::new();

        if values.len() >= FFT_MIN_SAMPLES {
            let fft = FftAnalyzer::with_defaults(cfg.sample_rate_hz).analyze(&values);
            out_points.push(points::fft_summary(&cfg.signal_id, &fft, now));
            out_points.push(points::fft_spectrum(&cfg.signal_id, &fft, now));
            out_points.extend(points::fft_dominant_modes(&cfg.signal_id, &fft, now));
        }

        if values.len() >= OSCILLATION_SNR_MIN_SAMPLES {
            let oscillation = OscillationDetector::new(cfg.sample_rate_hz, cfg.oscillation_band_hz).analyze(&values);
            out_points.push(points::oscillation_events(&cfg.signal_id, &oscillation));
            if let Some(severity) = oscillation.alert_severity() {
                out_points.push(points::oscillation_alert(&cfg.signal_id, &oscillation, severity));
            }

            let snr = SnrEstimator::with_defaults(cfg.sample_rate_hz, cfg.fundamental_hz).analyze(&values);
            out_points.push(points::snr_metrics(&cfg.signal_id, &snr, now));
        }

        if let Some(latest) = window.last() {
            let fault = self.fault.check(&cfg.signal_id, cfg.signal_type, latest.value, latest.timestamp, None);
            if fault.detected {
                out_points.push(points::fault_event(&cfg.signal_id, &fault));
            }
        }

        if out_points.is_empty() {
            return;
        }

        if let Err(e) = self.source.write_points(&self.analysis_db, out_points).await {
            tracing::error!(signal_id = %cfg.signal_id, error = %e, "failed to write analysis results");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pmu_tsdb::InMemoryStore;
    use pmu_types::{Sample, SignalType};

    fn ts(i: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(i, 0).unwrap()
    }

    fn seed_sine(store: &InMemoryStore, db: &str, signal_id: &str, n: usize, sample_rate: f64, freq: f64) {
        for i in 0..n {
            let t = i as f64 / sample_rate;
            let v = (2.0 * std::f64::consts::PI * freq * t).sin();
            store.seed_sample(db, Sample::new(signal_id, ts(i as i64), v));
        }
    }

    #[tokio::test]
    async fn fewer_than_minimum_samples_is_skipped_with_no_output() {
        let tsdb = Arc::new(InMemoryStore::new());
        seed_sine(&tsdb, "pmu_data", "F1", 5, 32.0, 3.0);
        let cfg = SignalAnalysisConfig::new("F1", SignalType::Frequency, 32.0);
        let scheduler = AnalysisScheduler::new(vec![cfg], tsdb.clone(), "pmu_data", "pmu_analysis", 256);

        scheduler.run_cycle().await;
        assert!(tsdb.all_points("pmu_analysis").is_empty());
    }

    #[tokio::test]
    async fn fft_runs_at_64_but_oscillation_and_snr_wait_for_128() {
        let tsdb = Arc::new(InMemoryStore::new());
        seed_sine(&tsdb, "pmu_data", "F1", 100, 32.0, 3.0);
        let cfg = SignalAnalysisConfig::new("F1", SignalType::Frequency, 32.0);
        let scheduler = AnalysisScheduler::new(vec![cfg], tsdb.clone(), "pmu_data", "pmu_analysis", 256);

        scheduler.run_cycle().await;
        let measurements: Vec<String> = tsdb
            .all_points("pmu_analysis")
            .iter()
            .map(|p| p.measurement.clone())
            .collect();
        assert!(measurements.contains(&"fft_summary".to_string()));
        assert!(!measurements.contains(&"snr_metrics".to_string()));
    }

    #[tokio::test]
    async fn full_window_emits_fft_oscillation_and_snr_measurements() {
        let tsdb = Arc::new(InMemoryStore::new());
        seed_sine(&tsdb, "pmu_data", "F1", 200, 32.0, 3.0);
        let cfg = SignalAnalysisConfig::new("F1", SignalType::Frequency, 32.0);
        let scheduler = AnalysisScheduler::new(vec![cfg], tsdb.clone(), "pmu_data", "pmu_analysis", 256);

        scheduler.run_cycle().await;
        let measurements: Vec<String> = tsdb
            .all_points("pmu_analysis")
            .iter()
            .map(|p| p.measurement.clone())
            .collect();
        for expected in ["fft_summary", "fft_spectrum", "fft_dominant_modes", "oscillation_events", "snr_metrics"] {
            assert!(measurements.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn unreachable_source_signal_is_skipped_without_panicking() {
        let tsdb = Arc::new(InMemoryStore::new());
        let cfg = SignalAnalysisConfig::new("GHOST", SignalType::Frequency, 32.0);
        let scheduler = AnalysisScheduler::new(vec![cfg], tsdb, "pmu_data", "pmu_analysis", 256);
        scheduler.run_cycle().await;
    }
}
