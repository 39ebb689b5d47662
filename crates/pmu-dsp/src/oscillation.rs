//! Oscillation Detector (C4, spec.md §4.3).

use chrono::Utc;
use pmu_types::{OscillationResult, OscillationType};

use crate::filter::BandpassFilter;
use crate::hilbert::envelope;
use crate::window::{apply_window, de_mean, fit_window, hamming, mean, real_dft};

pub const DEFAULT_WINDOW: usize = 128;
const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 3.0;
const LOCAL_MODE_CUTOFF_HZ: f64 = 0.8;
const MIN_PEAK_SEPARATION: usize = 5;
const LOG_EPSILON: f64 = 1e-12;

/// Bandpass-filtered inter-area/local oscillation detection with damping
/// estimation.
pub struct OscillationDetector {
    window_size: usize,
    sample_rate: f64,
    band: (f64, f64),
    threshold_multiplier: f64,
    filter: BandpassFilter,
}

impl OscillationDetector {
    pub fn new(sample_rate: f64, band_hz: (f64, f64)) -> Self {
        Self::with_window(DEFAULT_WINDOW, sample_rate, band_hz, DEFAULT_THRESHOLD_MULTIPLIER)
    }

    pub fn with_window(
        window_size: usize,
        sample_rate: f64,
        band_hz: (f64, f64),
        threshold_multiplier: f64,
    ) -> Self {
        let nyquist = sample_rate / 2.0;
        let (f_lo, f_hi) = band_hz;
        let mut low = f_lo / nyquist;
        let mut high = f_hi / nyquist;

        if low <= 0.0 || high >= 1.0 || low >= high {
            tracing::warn!(
                f_lo,
                f_hi,
                sample_rate,
                "oscillation band invalid after normalization, clamping"
            );
            low = 0.001;
            high = 0.999;
            if low >= high {
                low = 0.05;
                high = 0.45;
            }
        }

        let filter = BandpassFilter::design(low, high);
        let band = (low * nyquist, high * nyquist);

        Self {
            window_size,
            sample_rate,
            band,
            threshold_multiplier,
            filter,
        }
    }

    pub fn analyze(&self, samples: &[f64]) -> OscillationResult {
        let windowed = fit_window(samples, self.window_size);
        let demeaned = de_mean(&windowed);
        let filtered = self.filter.apply(&demeaned);

        let oscillation_power = mean_square(&filtered);
        let total_power = mean_square(&demeaned);
        let baseline_power = (total_power - oscillation_power).max(0.0);
        let threshold = baseline_power * self.threshold_multiplier;
        let detected = oscillation_power > threshold;

        let env = envelope(&filtered);
        let damping_ratio = estimate_damping(&env);

        let (dominant_frequency, dominant_magnitude) = self.dominant_in_band(&filtered);

        let oscillation_type = if !detected {
            OscillationType::None
        } else if dominant_frequency < LOCAL_MODE_CUTOFF_HZ {
            OscillationType::InterArea
        } else {
            OscillationType::Local
        };

        OscillationResult {
            detected,
            dominant_frequency,
            dominant_magnitude,
            oscillation_type,
            in_band_power: oscillation_power,
            baseline_power,
            threshold,
            damping_ratio,
            timestamp: Utc::now(),
            band: self.band,
        }
    }

    fn dominant_in_band(&self, filtered: &[f64]) -> (f64, f64) {
        let w = filtered.len();
        let hammed = apply_window(filtered, &hamming(w));
        let spectrum = real_dft(&hammed);
        let half = w / 2;

        let (mut best_freq, mut best_mag) = (0.0, 0.0);
        for (k, bin) in spectrum.iter().take(half).enumerate().skip(1) {
            let freq = k as f64 * self.sample_rate / w as f64;
            if freq < self.band.0 || freq > self.band.1 {
                continue;
            }
            let mag = 2.0 * bin.norm() / w as f64;
            if mag > best_mag {
                best_mag = mag;
                best_freq = freq;
            }
        }
        (best_freq, best_mag)
    }
}

fn mean_square(x: &[f64]) -> f64 {
    if x.is_empty() {
        0.0
    } else {
        x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64
    }
}

/// Peaks with a minimum index separation of [`MIN_PEAK_SEPARATION`], then a
/// linear regression of `log(peak + eps)` against peak index (spec.md §4.3
/// step 8 — the slope axis is sample index, not time, preserved from the
/// source system for compatibility).
fn estimate_damping(env: &[f64]) -> f64 {
    let peaks = find_peaks(env, MIN_PEAK_SEPARATION);
    if peaks.len() < 2 {
        return 0.0;
    }

    let xs: Vec<f64> = peaks.iter().map(|&(i, _)| i as f64).collect();
    let ys: Vec<f64> = peaks.iter().map(|&(_, v)| (v + LOG_EPSILON).ln()).collect();

    let slope = match linear_regression_slope(&xs, &ys) {
        Some(s) => s,
        None => return 0.0,
    };
    let d = -slope;
    let zeta = d / (d * d + (2.0 * std::f64::consts::PI).powi(2)).sqrt();
    zeta.clamp(0.0, 1.0)
}

fn find_peaks(x: &[f64], min_separation: usize) -> Vec<(usize, f64)> {
    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;
    for i in 1..x.len().saturating_sub(1) {
        if x[i] > x[i - 1] && x[i] >= x[i + 1] {
            if let Some(last) = last_peak {
                if i - last < min_separation {
                    continue;
                }
            }
            peaks.push((i, x[i]));
            last_peak = Some(i);
        }
    }
    peaks
}

fn linear_regression_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    if n < 2.0 {
        return None;
    }
    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let mut num = 0.0;
    let mut den = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den.abs() < 1e-15 {
        None
    } else {
        Some(num / den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_oscillation(freq: f64, amp: f64, sigma: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        // Deterministic pseudo-noise so the test doesn't depend on an RNG crate.
        (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let signal = amp * (2.0 * std::f64::consts::PI * freq * t).sin();
                let pseudo_noise = sigma * ((i as f64 * 12.9898).sin() * 43758.5453).fract();
                signal + pseudo_noise
            })
            .collect()
    }

    #[test]
    fn damping_ratio_is_in_unit_range() {
        let detector = OscillationDetector::new(20.0, (0.2, 2.5));
        let samples = noisy_oscillation(0.5, 0.2, 0.02, 20.0, 128);
        let r = detector.analyze(&samples);
        assert!(r.damping_ratio >= 0.0 && r.damping_ratio <= 1.0);
    }

    #[test]
    fn not_detected_implies_type_none() {
        let detector = OscillationDetector::new(20.0, (0.2, 2.5));
        let flat = vec![0.0; 128];
        let r = detector.analyze(&flat);
        assert!(!r.detected);
        assert_eq!(r.oscillation_type, OscillationType::None);
    }

    #[test]
    fn strong_low_frequency_oscillation_detected_as_inter_area() {
        let sample_rate = 20.0;
        let detector = OscillationDetector::new(sample_rate, (0.2, 2.5));
        let samples = noisy_oscillation(0.5, 0.2, 0.02, sample_rate, 128);
        let r = detector.analyze(&samples);
        assert!(r.detected);
        assert_eq!(r.oscillation_type, OscillationType::InterArea);
        assert!(r.dominant_frequency >= 0.4 && r.dominant_frequency <= 0.6);
        assert!(r.damping_ratio < 0.2);
    }

    #[test]
    fn invalid_band_falls_back_without_panicking() {
        let detector = OscillationDetector::new(20.0, (-1.0, 50.0));
        let r = detector.analyze(&vec![0.1; 128]);
        assert!(r.band.0 < r.band.1);
    }
}
