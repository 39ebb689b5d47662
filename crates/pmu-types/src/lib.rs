//! # PMU Types — shared data model for the PMU monitoring pipeline
//!
//! This crate holds the typed records every other crate in the workspace
//! passes around: [`Sample`], [`SignalConfig`], the four analysis results
//! ([`FftResult`], [`OscillationResult`], [`SnrResult`], [`FaultResult`]),
//! and the warning engine's [`ThresholdConfig`] / [`WarningEvent`].
//!
//! Analyzers hand back typed records with explicit optional fields, not
//! dynamic dictionaries — a caller that wants `dominant_frequency` reads
//! `result.dominant_frequency`, not `result["dominant_frequency"]`.

pub mod error;
pub mod fault;
pub mod fft;
pub mod oscillation;
pub mod sample;
pub mod signal;
pub mod snr;
pub mod threshold;
pub mod warning;

pub use error::{ConfigError, ConfigResult};
pub use fault::{FaultResult, FaultSeverity};
pub use fft::FftResult;
pub use oscillation::{OscillationResult, OscillationType};
pub use sample::Sample;
pub use signal::{SignalConfig, SignalType};
pub use snr::{SnrQuality, SnrResult};
pub use threshold::ThresholdConfig;
pub use warning::{EventSeverity, EventState, ThresholdKind, WarningEvent};
