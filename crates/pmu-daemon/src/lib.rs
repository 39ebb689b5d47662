//! PMU daemon library
//!
//! Wires the ring buffer, windowed DSP analyzers, fault detector, and
//! warning engine around a shared TSDB gateway, and runs the periodic
//! analysis loop alongside the warning store's drain loop until a
//! shutdown signal arrives. It exposes the same kind of `run()` entry
//! point `palm-daemon` exposes, but leaves the HTTP query surface to a
//! collaborator — there is no router here.

pub mod config;
pub mod error;

use std::sync::Arc;
use std::time::Duration;

use pmu_scheduler::{AnalysisScheduler, SignalAnalysisConfig};
use pmu_tsdb::{HttpTimeSeriesStore, TimeSeriesStore};
use pmu_warning::WarningManager;

pub use config::PmuDaemonConfig;
pub use error::{DaemonError, DaemonResult};

const SCHEDULER_SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

fn analysis_configs(config: &PmuDaemonConfig) -> Vec<SignalAnalysisConfig> {
    config
        .signals
        .values()
        .map(|signal| {
            SignalAnalysisConfig::new(signal.signal_id.clone(), signal.signal_type, config.sample_rate_hz)
        })
        .collect()
}

/// Builds the shared components and runs them until the process receives
/// Ctrl+C or (on Unix) SIGTERM, then drains both loops with the 5s join
/// timeout the warning manager and analysis scheduler already honor.
pub async fn run(config: PmuDaemonConfig) -> DaemonResult<()> {
    if config.signals.is_empty() {
        return Err(DaemonError::NoSignalsConfigured);
    }

    let store = HttpTimeSeriesStore::new(&config.tsdb.host, config.tsdb.port)
        .map_err(|e| DaemonError::Config(e.to_string()))?;
    let tsdb: Arc<dyn TimeSeriesStore> = Arc::new(store);

    let scheduler = Arc::new(AnalysisScheduler::new(
        analysis_configs(&config),
        tsdb.clone(),
        config.source_db.clone(),
        config.analysis_db.clone(),
        256,
    ));
    let scheduler_handle = scheduler.clone().spawn(Duration::from_secs_f64(config.analysis_interval_s));

    let manager = WarningManager::new(config.effective_thresholds(), tsdb, config.warning_db.clone());
    manager.start(Duration::from_secs_f64(config.warning_drain_interval_s));

    tracing::info!(
        signals = config.signals.len(),
        analysis_interval_s = config.analysis_interval_s,
        "pmu daemon running"
    );

    shutdown_signal().await;
    tracing::info!("shutdown signal received, draining loops");

    scheduler.stop();
    manager.stop().await;
    if tokio::time::timeout(SCHEDULER_SHUTDOWN_JOIN_TIMEOUT, scheduler_handle).await.is_err() {
        tracing::warn!("analysis scheduler loop did not stop within the shutdown timeout");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received terminate signal"),
    }
}
