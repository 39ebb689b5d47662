//! Warning Manager (C10, spec.md §4.9): binds the real-time engine (C8) to
//! the batched store (C9) and exposes the surface an ingestion adapter or
//! HTTP layer needs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pmu_tsdb::TimeSeriesStore;
use pmu_types::{EventSeverity, EventState, ThresholdConfig, WarningEvent};
use tokio::task::JoinHandle;

use crate::engine::ThresholdEngine;
use crate::stats::StatsSnapshot;
use crate::store::{WarningStore, DEFAULT_DRAIN_INTERVAL};

const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub active_count: usize,
    pub by_severity: HashMap<EventSeverity, usize>,
    pub by_signal: HashMap<String, usize>,
    pub avg_check_latency: Duration,
    pub max_check_latency: Duration,
    pub total_checks: u64,
    pub checks_per_second: f64,
}

pub struct WarningManager {
    engine: Arc<ThresholdEngine>,
    store: Arc<WarningStore>,
    started_at: Instant,
    drain_handle: Mutex<Option<JoinHandle<()>>>,
}

impl WarningManager {
    pub fn new(
        configs: Vec<ThresholdConfig>,
        tsdb: Arc<dyn TimeSeriesStore>,
        warning_db: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine: Arc::new(ThresholdEngine::new(configs)),
            store: Arc::new(WarningStore::new(tsdb, warning_db)),
            started_at: Instant::now(),
            drain_handle: Mutex::new(None),
        })
    }

    /// Spawn the C9 background drain loop. `check_value` works without
    /// calling this (events just accumulate in the queue), but no batch is
    /// ever written to the store until the loop is running.
    pub fn start(self: &Arc<Self>, drain_interval: Duration) {
        let handle = self.store.clone().spawn_drain_loop(drain_interval);
        *self.drain_handle.lock() = Some(handle);
    }

    pub fn start_with_defaults(self: &Arc<Self>) {
        self.start(DEFAULT_DRAIN_INTERVAL);
    }

    /// Join the drain loop with a bounded timeout (spec.md §5 shutdown).
    pub async fn stop(&self) {
        self.store.stop();
        let handle = self.drain_handle.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("warning store drain loop did not stop within the shutdown timeout");
            }
        }
    }

    /// Delegates to C8 on the caller's thread; enqueues any resulting
    /// state-change event into C9. Never blocks on I/O.
    pub fn check_value(&self, signal_id: &str, value: f64, ts: DateTime<Utc>) -> Option<WarningEvent> {
        let event = self.engine.check(signal_id, value, ts);
        if let Some(event) = &event {
            self.store.enqueue(event.clone());
        }
        event
    }

    pub fn get_active_warnings(&self) -> Vec<WarningEvent> {
        self.engine.active_events()
    }

    pub async fn query_historical(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        signal_id: Option<&str>,
        severity: Option<EventSeverity>,
        state: Option<EventState>,
        limit: Option<usize>,
    ) -> Vec<WarningEvent> {
        self.store.query_historical(start, end, signal_id, severity, state, limit).await
    }

    /// Returns whether an active event with this id was found and
    /// acknowledged.
    pub fn acknowledge_event(&self, event_id: &str, user: &str) -> bool {
        match self.engine.acknowledge(event_id, user, Utc::now()) {
            Some(event) => {
                self.store.enqueue(event);
                true
            }
            None => false,
        }
    }

    /// Atomically replaces C8 with a new engine bound to the same
    /// configuration list; C9 is untouched (spec.md §4.9).
    pub fn update_thresholds(&self, configs: Vec<ThresholdConfig>) {
        self.engine.reconfigure(configs);
    }

    pub fn get_statistics(&self) -> Statistics {
        let StatsSnapshot {
            total_checks,
            avg_check_latency,
            max_check_latency,
            checks_per_second,
        } = self.engine.stats().snapshot(self.started_at);

        let active = self.engine.active_events();
        let mut by_severity: HashMap<EventSeverity, usize> = HashMap::new();
        let mut by_signal: HashMap<String, usize> = HashMap::new();
        for event in &active {
            *by_severity.entry(event.severity).or_insert(0) += 1;
            *by_signal.entry(event.signal_id.clone()).or_insert(0) += 1;
        }

        Statistics {
            active_count: active.len(),
            by_severity,
            by_signal,
            avg_check_latency,
            max_check_latency,
            total_checks,
            checks_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmu_tsdb::InMemoryStore;
    use pmu_types::SignalType;

    fn ts(seconds: f64) -> DateTime<Utc> {
        let nanos = (seconds * 1_000_000_000.0) as i64;
        DateTime::<Utc>::from_timestamp(nanos / 1_000_000_000, (nanos % 1_000_000_000) as u32).unwrap()
    }

    fn warning_config() -> ThresholdConfig {
        let mut cfg = ThresholdConfig::new("F1", SignalType::Frequency);
        cfg.warning_max = Some(60.15);
        cfg
    }

    #[tokio::test]
    async fn check_value_enqueues_triggered_events_for_persistence() {
        let tsdb = Arc::new(InMemoryStore::new());
        let manager = WarningManager::new(vec![warning_config()], tsdb, "pmu_warnings_test");

        manager.check_value("F1", 60.20, ts(0.0));
        manager.check_value("F1", 60.21, ts(1.0));
        let event = manager.check_value("F1", 60.22, ts(2.0)).expect("triggers");

        assert!(manager.acknowledge_event(&event.event_id, "operator"));
        assert!(!manager.acknowledge_event("unknown_id", "operator"));
    }

    #[tokio::test]
    async fn statistics_reflect_active_events_by_severity_and_signal() {
        let tsdb = Arc::new(InMemoryStore::new());
        let manager = WarningManager::new(vec![warning_config()], tsdb, "pmu_warnings_test");
        manager.check_value("F1", 60.20, ts(0.0));
        manager.check_value("F1", 60.21, ts(1.0));
        manager.check_value("F1", 60.22, ts(2.0));

        let stats = manager.get_statistics();
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.by_severity.get(&EventSeverity::Warning), Some(&1));
        assert_eq!(stats.by_signal.get("F1"), Some(&1));
        assert_eq!(stats.total_checks, 3);
    }

    #[tokio::test]
    async fn start_and_stop_drain_loop_does_not_hang() {
        let tsdb = Arc::new(InMemoryStore::new());
        let manager = WarningManager::new(vec![warning_config()], tsdb, "pmu_warnings_test");
        manager.start(Duration::from_millis(10));
        manager.check_value("F1", 60.20, ts(0.0));
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.stop().await;
    }

    /// Carries forward the original system's own acceptance check for
    /// C8-C10: register thresholds, confirm a normal value passes, trigger
    /// on the third violation, read back the active set and statistics,
    /// acknowledge, loosen thresholds, then stop cleanly.
    #[tokio::test]
    async fn warning_manager_end_to_end_walkthrough() {
        fn test_freq_config() -> ThresholdConfig {
            let mut cfg = ThresholdConfig::new("TEST_FREQ", SignalType::Frequency);
            cfg.warning_min = Some(59.85);
            cfg.warning_max = Some(60.15);
            cfg.critical_min = Some(59.5);
            cfg.critical_max = Some(60.5);
            cfg.trigger_count = 3;
            cfg.trigger_window_s = 5.0;
            cfg.recovery_count = 2;
            cfg.recovery_window_s = 3.0;
            cfg
        }

        let tsdb = Arc::new(InMemoryStore::new());
        let manager = WarningManager::new(vec![test_freq_config()], tsdb, "pmu_warnings_test");

        assert!(manager.check_value("TEST_FREQ", 60.0, ts(0.0)).is_none());

        assert!(manager.check_value("TEST_FREQ", 60.20, ts(1.0)).is_none());
        assert!(manager.check_value("TEST_FREQ", 60.21, ts(2.0)).is_none());
        let triggered = manager
            .check_value("TEST_FREQ", 60.22, ts(3.0))
            .expect("3rd consecutive violation triggers");
        assert_eq!(triggered.severity, EventSeverity::Warning);
        assert_eq!(triggered.signal_id, "TEST_FREQ");

        let active = manager.get_active_warnings();
        assert_eq!(active.len(), 1);

        let stats = manager.get_statistics();
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.total_checks, 4);

        assert!(manager.acknowledge_event(&active[0].event_id, "test_user"));

        let mut relaxed = test_freq_config();
        relaxed.warning_min = Some(59.8);
        relaxed.warning_max = Some(60.2);
        relaxed.trigger_count = 2;
        relaxed.trigger_window_s = 3.0;
        manager.update_thresholds(vec![relaxed]);

        manager.stop().await;
    }
}
