use thiserror::Error;

/// Daemon-level errors (process boundary; internal crates keep their own
/// scoped error enums — spec.md §7 propagation policy).
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no signals configured")]
    NoSignalsConfigured,
}

pub type DaemonResult<T> = Result<T, DaemonError>;
