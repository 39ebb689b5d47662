//! SNR / THD Estimator (C5, spec.md §4.4).

use pmu_types::{SnrQuality, SnrResult};

use crate::window::{apply_window, de_mean, fit_window, hamming, mean, real_dft};

pub const DEFAULT_WINDOW: usize = 128;
const NOISE_FLOOR: f64 = 1e-12;
const TOP_BIN_FRACTION: f64 = 0.05;
const HARMONIC_BIN_RADIUS: usize = 2;
const MAX_HARMONIC: usize = 5;

/// Frequency-domain and time-domain SNR, averaged, plus THD and DC offset.
pub struct SnrEstimator {
    window_size: usize,
    sample_rate: f64,
    fundamental_hz: Option<f64>,
}

impl SnrEstimator {
    pub fn new(window_size: usize, sample_rate: f64, fundamental_hz: Option<f64>) -> Self {
        Self {
            window_size,
            sample_rate,
            fundamental_hz,
        }
    }

    pub fn with_defaults(sample_rate: f64, fundamental_hz: Option<f64>) -> Self {
        Self::new(DEFAULT_WINDOW, sample_rate, fundamental_hz)
    }

    pub fn analyze(&self, samples: &[f64]) -> SnrResult {
        let raw = fit_window(samples, self.window_size);
        let dc_offset = mean(&raw);
        let demeaned = de_mean(&raw);

        let (signal_power, noise_power) = self.frequency_domain_powers(&demeaned);
        let snr_freq_db = 10.0 * (signal_power.max(NOISE_FLOOR) / noise_power).log10();
        let thd_percent = self.thd(&demeaned);
        let snr_time_db = self.time_domain(&raw, &demeaned);
        let snr_db = (snr_freq_db + snr_time_db) / 2.0;

        SnrResult {
            snr_db,
            snr_freq_db,
            snr_time_db,
            signal_power,
            noise_power,
            thd_percent,
            dc_offset,
            quality: SnrQuality::from_db(snr_db),
        }
    }

    fn spectrum(&self, demeaned: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let w = demeaned.len();
        let hammed = apply_window(demeaned, &hamming(w));
        let bins = real_dft(&hammed);
        let half = w / 2;
        let frequencies: Vec<f64> = (0..half)
            .map(|k| k as f64 * self.sample_rate / w as f64)
            .collect();
        let magnitudes: Vec<f64> = bins.iter().take(half).map(|c| 2.0 * c.norm() / w as f64).collect();
        (frequencies, magnitudes)
    }

    fn frequency_domain_powers(&self, demeaned: &[f64]) -> (f64, f64) {
        let (frequencies, magnitudes) = self.spectrum(demeaned);
        let power: Vec<f64> = magnitudes.iter().map(|m| m * m / demeaned.len() as f64).collect();

        let signal_idx: Vec<usize> = match self.fundamental_hz {
            Some(f0) if f0 > 0.0 => harmonic_bin_indices(&frequencies, f0),
            _ => top_fraction_indices(&power, TOP_BIN_FRACTION),
        };

        let signal_power: f64 = signal_idx.iter().map(|&i| power[i]).sum();
        let noise_bins: Vec<f64> = power
            .iter()
            .enumerate()
            .filter(|(i, _)| !signal_idx.contains(i))
            .map(|(_, &p)| p)
            .collect();
        let noise_power = mean(&noise_bins).max(NOISE_FLOOR);

        (signal_power, noise_power)
    }

    fn thd(&self, demeaned: &[f64]) -> f64 {
        let f0 = match self.fundamental_hz {
            Some(f0) if f0 > 0.0 => f0,
            _ => return 0.0,
        };
        let (frequencies, magnitudes) = self.spectrum(demeaned);
        let m1 = nearest_bin_magnitude(&frequencies, &magnitudes, f0);
        if m1 < NOISE_FLOOR {
            return 0.0;
        }
        let harmonic_sum_sq: f64 = (2..=MAX_HARMONIC)
            .map(|h| {
                let m = nearest_bin_magnitude(&frequencies, &magnitudes, f0 * h as f64);
                m * m
            })
            .sum();
        100.0 * harmonic_sum_sq.sqrt() / m1
    }

    fn time_domain(&self, raw: &[f64], demeaned: &[f64]) -> f64 {
        let sg_len = savgol_window_len(demeaned.len());
        let smoothed = savgol_smooth(demeaned, sg_len)
            .unwrap_or_else(|| moving_average(demeaned, (20usize).min((raw.len() / 10).max(1))));

        let signal_power = mean_square(&smoothed);
        let residual: Vec<f64> = demeaned.iter().zip(&smoothed).map(|(r, s)| r - s).collect();
        let noise_power = mean_square(&residual).max(NOISE_FLOOR);
        10.0 * (signal_power.max(NOISE_FLOOR) / noise_power).log10()
    }
}

fn mean_square(x: &[f64]) -> f64 {
    if x.is_empty() {
        0.0
    } else {
        x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64
    }
}

fn harmonic_bin_indices(frequencies: &[f64], f0: f64) -> Vec<usize> {
    let mut idx = Vec::new();
    for h in 1..=MAX_HARMONIC {
        let target = f0 * h as f64;
        if let Some(center) = nearest_bin_index(frequencies, target) {
            let lo = center.saturating_sub(HARMONIC_BIN_RADIUS);
            let hi = (center + HARMONIC_BIN_RADIUS).min(frequencies.len() - 1);
            for i in lo..=hi {
                if !idx.contains(&i) {
                    idx.push(i);
                }
            }
        }
    }
    idx
}

fn top_fraction_indices(power: &[f64], fraction: f64) -> Vec<usize> {
    let count = ((power.len() as f64) * fraction).ceil().max(1.0) as usize;
    let mut ranked: Vec<usize> = (0..power.len()).collect();
    ranked.sort_by(|&a, &b| power[b].partial_cmp(&power[a]).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(count);
    ranked
}

fn nearest_bin_index(frequencies: &[f64], target: f64) -> Option<usize> {
    if frequencies.is_empty() {
        return None;
    }
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (i, &f) in frequencies.iter().enumerate() {
        let d = (f - target).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    Some(best)
}

fn nearest_bin_magnitude(frequencies: &[f64], magnitudes: &[f64], target: f64) -> f64 {
    nearest_bin_index(frequencies, target)
        .map(|i| magnitudes[i])
        .unwrap_or(0.0)
}

/// `min(51, W-1)`, corrected to be odd (Savitzky-Golay requires odd window
/// length); spec.md §4.4's `min(51, W/2·2−1)` formula for even `W`.
fn savgol_window_len(w: usize) -> usize {
    let len = 51.min(w.saturating_sub(1));
    if len % 2 == 0 {
        len.saturating_sub(1)
    } else {
        len
    }
}

/// Local cubic least-squares smoothing. Returns `None` if `window_len` is
/// too small to fit a cubic or larger than the signal.
fn savgol_smooth(x: &[f64], window_len: usize) -> Option<Vec<f64>> {
    const ORDER: usize = 3;
    if window_len < ORDER + 1 || window_len > x.len() {
        return None;
    }
    let half = window_len / 2;
    let n = x.len();
    let mut out = vec![0.0; n];

    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        if hi - lo < ORDER + 1 {
            out[i] = x[i];
            continue;
        }

        let mut ata = [[0.0f64; ORDER + 1]; ORDER + 1];
        let mut atb = [0.0f64; ORDER + 1];
        for j in lo..hi {
            let dx = j as f64 - i as f64;
            let mut powers = [1.0f64; ORDER + 1];
            for p in 1..=ORDER {
                powers[p] = powers[p - 1] * dx;
            }
            for a in 0..=ORDER {
                for b in 0..=ORDER {
                    ata[a][b] += powers[a] * powers[b];
                }
                atb[a] += powers[a] * x[j];
            }
        }

        match solve_4x4(ata, atb) {
            Some(coeffs) => out[i] = coeffs[0],
            None => out[i] = x[i],
        }
    }
    Some(out)
}

/// Gaussian elimination with partial pivoting for the fixed 4x4 normal
/// equations produced by the cubic Savitzky-Golay fit.
fn solve_4x4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    const N: usize = 4;
    for col in 0..N {
        let mut pivot = col;
        for row in (col + 1)..N {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let mut sum = b[row];
        for k in (row + 1)..N {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

fn moving_average(x: &[f64], len: usize) -> Vec<f64> {
    let len = len.max(1);
    let half = len / 2;
    let n = x.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            mean(&x[lo..hi])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_plus_noise(freq: f64, sample_rate: f64, n: usize, sigma: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let signal = (2.0 * std::f64::consts::PI * freq * t).sin();
                let pseudo_noise = sigma * ((i as f64 * 78.233).sin() * 43758.5453).fract();
                signal + pseudo_noise
            })
            .collect()
    }

    #[test]
    fn quality_is_monotone_with_snr_db() {
        assert!(SnrQuality::from_db(45.0) > SnrQuality::from_db(25.0));
    }

    #[test]
    fn clean_tone_has_higher_snr_than_noisy_tone() {
        let estimator = SnrEstimator::with_defaults(64.0, Some(4.0));
        let clean = estimator.analyze(&tone_plus_noise(4.0, 64.0, 128, 0.001));
        let noisy = estimator.analyze(&tone_plus_noise(4.0, 64.0, 128, 0.5));
        assert!(clean.snr_db > noisy.snr_db);
    }

    #[test]
    fn thd_is_zero_without_fundamental() {
        let estimator = SnrEstimator::with_defaults(64.0, None);
        let r = estimator.analyze(&tone_plus_noise(4.0, 64.0, 128, 0.01));
        assert_eq!(r.thd_percent, 0.0);
    }

    #[test]
    fn dc_offset_matches_window_mean() {
        let estimator = SnrEstimator::with_defaults(10.0, None);
        let samples = vec![5.0; 64];
        let r = estimator.analyze(&samples);
        assert!((r.dc_offset - 5.0).abs() < 1e-9);
    }

    #[test]
    fn savgol_window_len_is_always_odd() {
        assert_eq!(savgol_window_len(128) % 2, 1);
        assert_eq!(savgol_window_len(8) % 2, 1);
    }

    #[test]
    fn all_outputs_are_finite() {
        let estimator = SnrEstimator::with_defaults(32.0, Some(2.0));
        let r = estimator.analyze(&tone_plus_noise(2.0, 32.0, 128, 0.1));
        assert!(r.snr_db.is_finite());
        assert!(r.snr_freq_db.is_finite());
        assert!(r.snr_time_db.is_finite());
        assert!(r.thd_percent.is_finite());
    }
}
