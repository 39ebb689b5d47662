//! Translation of analyzer results into [`Point`]s, one function per
//! measurement named in spec.md §4.6/§6.

use chrono::{DateTime, Utc};
use pmu_tsdb::{FieldValue, Point};
use pmu_types::{FaultResult, FftResult, OscillationResult, SnrResult};

pub fn fft_summary(signal_id: &str, r: &FftResult, time: DateTime<Utc>) -> Point {
    Point::new("fft_summary", time)
        .with_tag("signal_id", signal_id)
        .with_field("dominant_frequency", FieldValue::Float(r.dominant_frequency))
        .with_field("dominant_magnitude", FieldValue::Float(r.dominant_magnitude))
        .with_field("sample_rate", FieldValue::Float(r.sample_rate))
        .with_field("window_size", FieldValue::Int(r.window_size as i64))
}

/// One point carrying the full spectrum as JSON arrays, rather than one
/// point per bin — keeps cardinality independent of window size.
pub fn fft_spectrum(signal_id: &str, r: &FftResult, time: DateTime<Utc>) -> Point {
    Point::new("fft_spectrum", time)
        .with_tag("signal_id", signal_id)
        .with_field(
            "frequencies_json",
            FieldValue::Str(serde_json::to_string(&r.frequencies).unwrap_or_default()),
        )
        .with_field(
            "magnitudes_json",
            FieldValue::Str(serde_json::to_string(&r.magnitudes).unwrap_or_default()),
        )
        .with_field(
            "power_json",
            FieldValue::Str(serde_json::to_string(&r.power).unwrap_or_default()),
        )
}

pub fn fft_dominant_modes(signal_id: &str, r: &FftResult, time: DateTime<Utc>) -> Vec<Point> {
    r.dominant_modes
        .iter()
        .enumerate()
        .map(|(rank, &(freq, mag))| {
            Point::new("fft_dominant_modes", time)
                .with_tag("signal_id", signal_id)
                .with_tag("rank", rank.to_string())
                .with_field("frequency", FieldValue::Float(freq))
                .with_field("magnitude", FieldValue::Float(mag))
        })
        .collect()
}

pub fn oscillation_events(signal_id: &str, r: &OscillationResult) -> Point {
    Point::new("oscillation_events", r.timestamp)
        .with_tag("signal_id", signal_id)
        .with_tag("oscillation_type", r.oscillation_type.to_string())
        .with_tag("detected", r.detected.to_string())
        .with_field("detected", FieldValue::Bool(r.detected))
        .with_field("dominant_frequency", FieldValue::Float(r.dominant_frequency))
        .with_field("dominant_magnitude", FieldValue::Float(r.dominant_magnitude))
        .with_field("in_band_power", FieldValue::Float(r.in_band_power))
        .with_field("baseline_power", FieldValue::Float(r.baseline_power))
        .with_field("threshold", FieldValue::Float(r.threshold))
        .with_field("damping_ratio", FieldValue::Float(r.damping_ratio))
        .with_field("band_low", FieldValue::Float(r.band.0))
        .with_field("band_high", FieldValue::Float(r.band.1))
}

/// Only emitted when `r.alert_severity()` is `Some` (spec.md §4.6 step 5).
pub fn oscillation_alert(signal_id: &str, r: &OscillationResult, severity: &'static str) -> Point {
    Point::new("oscillation_alerts", r.timestamp)
        .with_tag("signal_id", signal_id)
        .with_tag("severity", severity)
        .with_field("dominant_frequency", FieldValue::Float(r.dominant_frequency))
        .with_field("damping_ratio", FieldValue::Float(r.damping_ratio))
        .with_field("oscillation_type", FieldValue::Str(r.oscillation_type.to_string()))
}

pub fn snr_metrics(signal_id: &str, r: &SnrResult, time: DateTime<Utc>) -> Point {
    Point::new("snr_metrics", time)
        .with_tag("signal_id", signal_id)
        .with_tag("quality", r.quality.to_string())
        .with_field("snr_db", FieldValue::Float(r.snr_db))
        .with_field("snr_linear", FieldValue::Float(10f64.powf(r.snr_db / 10.0)))
        .with_field("snr_freq_db", FieldValue::Float(r.snr_freq_db))
        .with_field("snr_time_db", FieldValue::Float(r.snr_time_db))
        .with_field("signal_power", FieldValue::Float(r.signal_power))
        .with_field("noise_power", FieldValue::Float(r.noise_power))
        .with_field("thd_percent", FieldValue::Float(r.thd_percent))
        .with_field("dc_offset", FieldValue::Float(r.dc_offset))
}

/// Only emitted when `r.detected` (spec.md §4.6 step 5).
pub fn fault_event(signal_id: &str, r: &FaultResult) -> Point {
    Point::new("fault_events", r.timestamp)
        .with_tag("signal_id", signal_id)
        .with_tag("signal_type", r.signal_type.to_string())
        .with_tag("severity", r.severity.to_string())
        .with_tag("fault_type", r.fault_type.clone().unwrap_or_else(|| "unknown".to_string()))
        .with_field("value", FieldValue::Float(r.value))
        .with_field("baseline", FieldValue::Float(r.baseline))
        .with_field("deviation", FieldValue::Float(r.deviation))
        .with_field("deviation_ratio", FieldValue::Float(r.deviation_ratio))
        .with_field("rate_of_change", FieldValue::Float(r.rate_of_change.unwrap_or(0.0)))
        .with_field("active", FieldValue::Bool(r.active))
        .with_field("message", FieldValue::Str(r.message.clone()))
}
