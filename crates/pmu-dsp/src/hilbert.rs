//! Analytic-signal envelope via the FFT-domain Hilbert transform, used by
//! the oscillation detector's damping estimate (spec.md §4.3 step 3).

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Magnitude of the analytic signal of `x`: zero the negative-frequency
/// half of the spectrum, double the positive half (leaving DC and Nyquist
/// alone), invert, take the modulus.
pub fn envelope(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }

    let mut spectrum: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fwd = planner.plan_fft_forward(n);
    fwd.process(&mut spectrum);

    let half = n / 2;
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let keep_as_is = k == 0 || (n % 2 == 0 && k == half);
        if keep_as_is {
            continue;
        }
        if k < half || (n % 2 == 1 && k == half) {
            *bin *= 2.0;
        } else {
            *bin = Complex64::new(0.0, 0.0);
        }
    }

    let inv = planner.plan_fft_inverse(n);
    inv.process(&mut spectrum);
    let scale = 1.0 / n as f64;
    spectrum.iter().map(|c| (c * scale).norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_of_constant_amplitude_sine_is_roughly_flat() {
        let n = 256;
        let sample_rate = 50.0;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 2.0 * i as f64 / sample_rate).sin())
            .collect();
        let env = envelope(&samples);
        // Ignore edge artifacts near the boundaries.
        let interior = &env[32..n - 32];
        let max = interior.iter().cloned().fold(f64::MIN, f64::max);
        let min = interior.iter().cloned().fold(f64::MAX, f64::min);
        assert!((max - min).abs() < 0.3, "max={max} min={min}");
        assert!(max > 0.5 && max < 1.5);
    }

    #[test]
    fn empty_input_yields_empty_envelope() {
        assert!(envelope(&[]).is_empty());
    }
}
