use thiserror::Error;

/// Errors raised while constructing or validating a data-model value
/// (invalid threshold configuration, non-finite bound, …). Analyzer and
/// engine crates define their own error enums for their own failure modes;
/// this one covers the shared types themselves.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("signal '{0}' has no warning or critical bounds configured")]
    NoBoundsConfigured(String),

    #[error("threshold bound must be finite, got {0}")]
    NonFiniteBound(f64),

    #[error("trigger_count and recovery_count must be at least 1")]
    InvalidCount,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
