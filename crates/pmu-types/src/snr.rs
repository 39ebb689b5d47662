/// Qualitative tier for a combined SNR value, in dB.
///
/// Monotone in `snr_db` with boundaries at 20/30/40 dB. Declared low-to-high
/// so the derived `Ord` ranks `Excellent` above `Good` above `Fair` above
/// `Poor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnrQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SnrQuality {
    pub fn from_db(snr_db: f64) -> Self {
        if snr_db > 40.0 {
            SnrQuality::Excellent
        } else if snr_db > 30.0 {
            SnrQuality::Good
        } else if snr_db > 20.0 {
            SnrQuality::Fair
        } else {
            SnrQuality::Poor
        }
    }
}

impl std::fmt::Display for SnrQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SnrQuality::Excellent => "excellent",
            SnrQuality::Good => "good",
            SnrQuality::Fair => "fair",
            SnrQuality::Poor => "poor",
        };
        write!(f, "{s}")
    }
}

/// Result of one SNR/THD estimation pass over a window.
#[derive(Debug, Clone, PartialEq)]
pub struct SnrResult {
    pub snr_db: f64,
    pub snr_freq_db: f64,
    pub snr_time_db: f64,
    pub signal_power: f64,
    pub noise_power: f64,
    pub thd_percent: f64,
    pub dc_offset: f64,
    pub quality: SnrQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_boundaries_are_strict_greater_than() {
        assert_eq!(SnrQuality::from_db(40.0), SnrQuality::Good);
        assert_eq!(SnrQuality::from_db(40.01), SnrQuality::Excellent);
        assert_eq!(SnrQuality::from_db(30.0), SnrQuality::Fair);
        assert_eq!(SnrQuality::from_db(20.0), SnrQuality::Poor);
    }
}
