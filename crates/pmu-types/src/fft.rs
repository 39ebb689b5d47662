/// Windowed FFT result for one signal at one point in time.
///
/// `frequencies`, `magnitudes` and `power` all have length `window_size / 2`
/// (the non-redundant bins of a real-valued DFT). `dominant_modes` holds the
/// five largest-magnitude bins (excluding DC) in descending order.
#[derive(Debug, Clone, PartialEq)]
pub struct FftResult {
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
    pub power: Vec<f64>,
    pub dominant_frequency: f64,
    pub dominant_magnitude: f64,
    pub dominant_modes: Vec<(f64, f64)>,
    pub sample_rate: f64,
    pub window_size: usize,
}

impl FftResult {
    /// Sum of `power` over bins whose frequency falls in `[f_lo, f_hi]`.
    pub fn band_power(&self, f_lo: f64, f_hi: f64) -> f64 {
        self.frequencies
            .iter()
            .zip(self.power.iter())
            .filter(|(f, _)| **f >= f_lo && **f <= f_hi)
            .map(|(_, p)| p)
            .sum()
    }
}
