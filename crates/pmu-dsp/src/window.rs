//! Shared windowing helpers used by the FFT analyzer, the oscillation
//! detector and the SNR estimator.

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Fit `samples` to exactly `w` points: keep the most recent `w` if there
/// are more, zero-pad on the left if there are fewer (spec.md §4.2).
pub fn fit_window(samples: &[f64], w: usize) -> Vec<f64> {
    if samples.len() >= w {
        samples[samples.len() - w..].to_vec()
    } else {
        let mut padded = vec![0.0; w - samples.len()];
        padded.extend_from_slice(samples);
        padded
    }
}

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

/// Subtract the mean (DC removal).
pub fn de_mean(samples: &[f64]) -> Vec<f64> {
    let m = mean(samples);
    samples.iter().map(|v| v - m).collect()
}

/// Hamming window of length `w`: `0.54 - 0.46*cos(2*pi*n/(w-1))`.
pub fn hamming(w: usize) -> Vec<f64> {
    if w <= 1 {
        return vec![1.0; w];
    }
    (0..w)
        .map(|n| 0.54 - 0.46 * (2.0 * std::f64::consts::PI * n as f64 / (w - 1) as f64).cos())
        .collect()
}

pub fn apply_window(samples: &[f64], window: &[f64]) -> Vec<f64> {
    samples.iter().zip(window).map(|(s, w)| s * w).collect()
}

/// Real-input DFT via `rustfft`. Returns all `w` complex bins (caller keeps
/// the non-redundant half, `0..w/2`).
pub fn real_dft(samples: &[f64]) -> Vec<Complex64> {
    let w = samples.len();
    let mut buf: Vec<Complex64> = samples.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(w);
    fft.process(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_window_pads_left_when_short() {
        let w = fit_window(&[1.0, 2.0, 3.0], 5);
        assert_eq!(w, vec![0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn fit_window_keeps_most_recent_when_long() {
        let samples: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let w = fit_window(&samples, 4);
        assert_eq!(w, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn de_mean_zeroes_the_average() {
        let d = de_mean(&[1.0, 2.0, 3.0]);
        assert!((mean(&d)).abs() < 1e-12);
    }

    #[test]
    fn hamming_endpoints_are_near_zero() {
        let h = hamming(8);
        assert!((h[0] - 0.08).abs() < 1e-9);
        assert_eq!(h.len(), 8);
    }
}
