//! Hot-path statistics for the real-time check path (spec.md §4.9, §9
//! design note: avoid locking on every check — monotonic atomics plus
//! coarse periodic aggregation in [`crate::manager::WarningManager::get_statistics`]).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct CheckStats {
    total_checks: AtomicU64,
    latency_sum_nanos: AtomicU64,
    latency_max_nanos: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub total_checks: u64,
    pub avg_check_latency: Duration,
    pub max_check_latency: Duration,
    pub checks_per_second: f64,
}

impl CheckStats {
    pub fn record(&self, elapsed: Duration) {
        let nanos = elapsed.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.latency_max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    /// `since` should be the instant the engine was constructed, to derive
    /// a throughput figure.
    pub fn snapshot(&self, since: Instant) -> StatsSnapshot {
        let total_checks = self.total_checks.load(Ordering::Relaxed);
        let sum_nanos = self.latency_sum_nanos.load(Ordering::Relaxed);
        let max_nanos = self.latency_max_nanos.load(Ordering::Relaxed);

        let avg_nanos = if total_checks > 0 { sum_nanos / total_checks } else { 0 };
        let elapsed_s = since.elapsed().as_secs_f64().max(1e-9);

        StatsSnapshot {
            total_checks,
            avg_check_latency: Duration::from_nanos(avg_nanos),
            max_check_latency: Duration::from_nanos(max_nanos),
            checks_per_second: total_checks as f64 / elapsed_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_samples() {
        let stats = CheckStats::default();
        let started = Instant::now();
        stats.record(Duration::from_micros(100));
        stats.record(Duration::from_micros(300));
        let snap = stats.snapshot(started);
        assert_eq!(snap.total_checks, 2);
        assert_eq!(snap.avg_check_latency, Duration::from_micros(200));
        assert_eq!(snap.max_check_latency, Duration::from_micros(300));
    }

    #[test]
    fn empty_snapshot_has_zero_average() {
        let stats = CheckStats::default();
        let snap = stats.snapshot(Instant::now());
        assert_eq!(snap.total_checks, 0);
        assert_eq!(snap.avg_check_latency, Duration::ZERO);
    }
}
