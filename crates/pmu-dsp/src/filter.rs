//! Fourth-order Butterworth bandpass filter in cascaded second-order-section
//! (SOS) form, used by the oscillation detector (C4, spec.md §4.3).
//!
//! Design path: a 2-pole analog Butterworth lowpass prototype, transformed
//! to a bandpass prototype (two conjugate pole pairs, one section each),
//! then discretized per-section by the bilinear transform. The cascade gain
//! is normalized to unity at the band-center digital frequency so
//! `oscillation_power` stays comparable to `baseline_power` regardless of
//! band placement.

use num_complex::Complex64;

/// One second-order section: `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, Copy)]
struct Sos {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Sos {
    fn response(&self, omega: f64) -> Complex64 {
        let z_inv = Complex64::from_polar(1.0, -omega);
        let z_inv2 = z_inv * z_inv;
        let num = self.b0 + self.b1 * z_inv + self.b2 * z_inv2;
        let den = Complex64::new(1.0, 0.0) + self.a1 * z_inv + self.a2 * z_inv2;
        num / den
    }
}

/// A 4th-order Butterworth bandpass filter (two cascaded biquads).
pub struct BandpassFilter {
    sections: [Sos; 2],
}

impl BandpassFilter {
    /// `low` and `high` are normalized digital frequencies in `(0, 1)`
    /// where `1` is the Nyquist frequency.
    pub fn design(low: f64, high: f64) -> Self {
        // 2-pole analog Butterworth lowpass prototype poles, unit cutoff:
        // p_k = exp(j*pi*(2k+1)/4), k = 0,1 -> conjugate pair at angle 3*pi/4.
        let proto_poles = [
            Complex64::from_polar(1.0, 3.0 * std::f64::consts::PI / 4.0),
            Complex64::from_polar(1.0, 5.0 * std::f64::consts::PI / 4.0),
        ];

        // Pre-warp band edges for the bilinear transform (c = 2, T = 1).
        let w_low = 2.0 * (std::f64::consts::PI * low / 2.0).tan();
        let w_high = 2.0 * (std::f64::consts::PI * high / 2.0).tan();
        let bw = w_high - w_low;
        let w0_sq = w_low * w_high;

        // Lowpass-to-bandpass: each prototype pole p maps to the two roots
        // of s^2 - p*BW*s + w0^2 = 0.
        let mut bp_pole_pairs = Vec::with_capacity(2);
        for &p in proto_poles.iter().take(1) {
            let b = p * bw;
            let disc = (b * b - 4.0 * w0_sq).sqrt();
            let s1 = (b + disc) / 2.0;
            let s2 = (b - disc) / 2.0;
            bp_pole_pairs.push((s1, s2));
        }
        // The second prototype pole is the conjugate of the first; its
        // bandpass image is the conjugate pair of the one just computed,
        // giving the second SOS section directly.
        let (s1, s2) = bp_pole_pairs[0];
        let sections_analog = [(s1, s2), (s1.conj(), s2.conj())];

        let mut sections = [
            Self::section_from_pole_pair(sections_analog[0]),
            Self::section_from_pole_pair(sections_analog[1]),
        ];

        let omega0 = (low + high) * std::f64::consts::PI / 2.0;
        let mut cascade_gain = Complex64::new(1.0, 0.0);
        for s in &sections {
            cascade_gain *= s.response(omega0);
        }
        let gain_correction = 1.0 / cascade_gain.norm().max(1e-300);
        sections[0].b0 *= gain_correction;
        sections[0].b1 *= gain_correction;
        sections[0].b2 *= gain_correction;

        Self { sections }
    }

    /// Build one discrete SOS from an analog conjugate pole pair, with a
    /// zero pair at the origin (the bandpass numerator is `s^2`).
    fn section_from_pole_pair(poles: (Complex64, Complex64)) -> Sos {
        let (p1, p2) = poles;
        // Analog denominator: (s - p1)(s - p2) = s^2 - (p1+p2)s + p1*p2.
        let sum = p1 + p2;
        let prod = p1 * p2;
        let a2 = 1.0;
        let a1 = (-sum).re;
        let a0 = prod.re;
        // Analog numerator: s^2 (a zero pair at the origin).
        let b2 = 1.0;
        let b1 = 0.0;
        let b0 = 0.0;

        // Bilinear transform with c = 2 (T = 1): s = c*(1 - z^-1)/(1 + z^-1).
        let c = 2.0;
        let c2 = c * c;
        let da0 = a2 * c2 + a1 * c + a0;
        let da1 = 2.0 * (a0 - a2 * c2);
        let da2 = a2 * c2 - a1 * c + a0;
        let nb0 = b2 * c2 + b1 * c + b0;
        let nb1 = 2.0 * (b0 - b2 * c2);
        let nb2 = b2 * c2 - b1 * c + b0;

        Sos {
            b0: nb0 / da0,
            b1: nb1 / da0,
            b2: nb2 / da0,
            a1: da1 / da0,
            a2: da2 / da0,
        }
    }

    /// Direct-form-II filtering of `input` through both cascaded sections.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let mut stage = input.to_vec();
        for s in &self.sections {
            stage = Self::apply_section(s, &stage);
        }
        stage
    }

    fn apply_section(s: &Sos, input: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(input.len());
        let (mut w1, mut w2) = (0.0, 0.0);
        for &x in input {
            let w0 = x - s.a1 * w1 - s.a2 * w2;
            let y = s.b0 * w0 + s.b1 * w1 + s.b2 * w2;
            w2 = w1;
            w1 = w0;
            out.push(y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn passes_in_band_tone_more_than_out_of_band_tone() {
        let sample_rate = 20.0;
        let nyquist = sample_rate / 2.0;
        let filter = BandpassFilter::design(0.2 / nyquist, 2.5 / nyquist);

        let in_band = sine(0.5, sample_rate, 256);
        let out_of_band = sine(8.0, sample_rate, 256);

        let out_in = filter.apply(&in_band);
        let out_out = filter.apply(&out_of_band);

        // Drop the transient.
        let rms_in = rms(&out_in[64..]);
        let rms_out = rms(&out_out[64..]);
        assert!(rms_in > rms_out);
    }

    #[test]
    fn output_is_finite() {
        let filter = BandpassFilter::design(0.1, 0.5);
        let out = filter.apply(&sine(1.0, 10.0, 64));
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
