use chrono::{DateTime, Utc};

/// A single PMU measurement: `(signal_id, timestamp, value)`.
///
/// Samples are immutable once created — the ingestion adapter produces
/// them, the ring buffer store deposits them, nothing mutates a `Sample`
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub signal_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(signal_id: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            signal_id: signal_id.into(),
            timestamp,
            value,
        }
    }

    /// A sample is only meaningful if its value is a finite real number.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_value() {
        let s = Sample::new("F1", Utc::now(), f64::NAN);
        assert!(!s.is_valid());
        let s = Sample::new("F1", Utc::now(), f64::INFINITY);
        assert!(!s.is_valid());
    }

    #[test]
    fn accepts_finite_value() {
        let s = Sample::new("F1", Utc::now(), 60.01);
        assert!(s.is_valid());
    }
}
