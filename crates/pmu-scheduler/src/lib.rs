//! Analysis Scheduler (C7, spec.md §4.6): periodic per-signal fan-out of
//! the FFT/oscillation/SNR/fault analyzers, results persisted through the
//! TSDB gateway.

mod config;
mod points;
mod scheduler;

pub use config::SignalAnalysisConfig;
pub use scheduler::{AnalysisScheduler, DEFAULT_ANALYSIS_INTERVAL};
