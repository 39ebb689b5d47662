//! FFT Analyzer (C3, spec.md §4.2).

use pmu_types::FftResult;

use crate::window::{apply_window, de_mean, fit_window, hamming, real_dft};

/// Default window size. Must be a power of two.
pub const DEFAULT_WINDOW: usize = 128;

/// Windowed magnitude/power spectrum with dominant-mode extraction.
pub struct FftAnalyzer {
    window_size: usize,
    sample_rate: f64,
}

impl FftAnalyzer {
    pub fn new(window_size: usize, sample_rate: f64) -> Self {
        Self {
            window_size,
            sample_rate,
        }
    }

    pub fn with_defaults(sample_rate: f64) -> Self {
        Self::new(DEFAULT_WINDOW, sample_rate)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Run the full analysis described in spec.md §4.2 over `samples`.
    pub fn analyze(&self, samples: &[f64]) -> FftResult {
        let w = self.window_size;
        let windowed = fit_window(samples, w);
        let demeaned = de_mean(&windowed);
        let hammed = apply_window(&demeaned, &hamming(w));
        let spectrum = real_dft(&hammed);

        let half = w / 2;
        let mut frequencies = Vec::with_capacity(half);
        let mut magnitudes = Vec::with_capacity(half);
        let mut power = Vec::with_capacity(half);

        for (k, bin) in spectrum.iter().take(half).enumerate() {
            let freq = k as f64 * self.sample_rate / w as f64;
            let mag = 2.0 * bin.norm() / w as f64;
            frequencies.push(freq);
            magnitudes.push(mag);
            power.push(mag * mag);
        }

        let (dominant_k, dominant_magnitude) = magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .fold((0usize, 0.0f64), |(best_k, best_m), (k, &m)| {
                if m > best_m {
                    (k, m)
                } else {
                    (best_k, best_m)
                }
            });
        let dominant_frequency = frequencies.get(dominant_k).copied().unwrap_or(0.0);

        let mut ranked: Vec<(f64, f64)> = frequencies
            .iter()
            .zip(magnitudes.iter())
            .skip(1)
            .map(|(&f, &m)| (f, m))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(5);

        FftResult {
            frequencies,
            magnitudes,
            power,
            dominant_frequency,
            dominant_magnitude,
            dominant_modes: ranked,
            sample_rate: self.sample_rate,
            window_size: w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pure_tone(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn output_arrays_have_w_over_2_length_and_nonnegative_magnitudes() {
        let analyzer = FftAnalyzer::new(128, 32.0);
        let samples = pure_tone(3.0, 32.0, 128);
        let r = analyzer.analyze(&samples);
        assert_eq!(r.frequencies.len(), 64);
        assert_eq!(r.magnitudes.len(), 64);
        assert_eq!(r.power.len(), 64);
        assert!(r.magnitudes.iter().all(|&m| m >= 0.0 && m.is_finite()));
    }

    #[test]
    fn pure_tone_dominant_frequency_matches_within_one_bin() {
        let sample_rate = 32.0;
        let w = 128;
        let analyzer = FftAnalyzer::new(w, sample_rate);
        let samples = pure_tone(3.0, sample_rate, w);
        let r = analyzer.analyze(&samples);
        let bin = sample_rate / w as f64;
        assert!((r.dominant_frequency - 3.0).abs() <= bin + 1e-9);
    }

    #[test]
    fn short_input_is_left_zero_padded() {
        let analyzer = FftAnalyzer::new(16, 8.0);
        let r = analyzer.analyze(&[1.0, 2.0, 3.0]);
        assert_eq!(r.window_size, 16);
        assert_eq!(r.frequencies.len(), 8);
    }

    #[test]
    fn dominant_modes_are_sorted_descending_and_exclude_dc() {
        let analyzer = FftAnalyzer::new(128, 32.0);
        let samples = pure_tone(3.0, 32.0, 128);
        let r = analyzer.analyze(&samples);
        assert!(r.dominant_modes.len() <= 5);
        for pair in r.dominant_modes.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert!(r.dominant_modes.iter().all(|&(f, _)| f > 0.0));
    }

    #[test]
    fn band_power_sums_only_bins_in_range() {
        let analyzer = FftAnalyzer::new(128, 32.0);
        let r = analyzer.analyze(&pure_tone(3.0, 32.0, 128));
        let narrow = r.band_power(2.9, 3.1);
        let wide = r.band_power(0.0, 16.0);
        assert!(narrow > 0.0);
        assert!(wide >= narrow);
    }
}
