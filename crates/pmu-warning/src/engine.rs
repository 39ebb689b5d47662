//! Real-time threshold engine (C8, spec.md §4.7): in-memory N-of-M trigger
//! and M-of-M recovery state machine.
//!
//! One [`parking_lot::Mutex`] guards every signal's history and active
//! event — spec.md calls for "a single mutual-exclusion primitive with
//! fine granularity (per call, not per signal)", acceptable because a hold
//! is bounded by a handful of arithmetic operations and deque pushes.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pmu_types::{EventSeverity, EventState, ThresholdConfig, ThresholdKind, WarningEvent};

use crate::stats::CheckStats;

/// Resource limit on trigger/recovery history length (spec.md §5).
const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone)]
struct TriggerEntry {
    ts: DateTime<Utc>,
    value: f64,
    severity: EventSeverity,
    threshold_kind: ThresholdKind,
    threshold_value: f64,
    deviation: f64,
}

#[derive(Debug, Clone)]
struct RecoveryEntry {
    ts: DateTime<Utc>,
}

#[derive(Default)]
struct SignalRuntime {
    trigger_history: VecDeque<TriggerEntry>,
    recovery_history: VecDeque<RecoveryEntry>,
    active: Option<WarningEvent>,
}

struct Inner {
    configs: HashMap<String, ThresholdConfig>,
    runtimes: HashMap<String, SignalRuntime>,
}

/// In-memory N-of-M trigger / M-of-M recovery state machine.
///
/// `check` never returns an `Err`: an unknown signal, a non-violating
/// value, or an in-progress trigger all resolve to `None` (spec.md §7 —
/// the real-time check path never raises across its boundary).
pub struct ThresholdEngine {
    inner: Mutex<Inner>,
    stats: CheckStats,
}

impl ThresholdEngine {
    pub fn new(configs: Vec<ThresholdConfig>) -> Self {
        let configs = configs.into_iter().map(|c| (c.signal_id.clone(), c)).collect();
        Self {
            inner: Mutex::new(Inner {
                configs,
                runtimes: HashMap::new(),
            }),
            stats: CheckStats::default(),
        }
    }

    pub fn stats(&self) -> &CheckStats {
        &self.stats
    }

    /// Current active (not yet recovered) events, newest insertion order not
    /// guaranteed — a snapshot copy safe to hand to a caller outside the lock.
    pub fn active_events(&self) -> Vec<WarningEvent> {
        self.inner
            .lock()
            .runtimes
            .values()
            .filter_map(|r| r.active.clone())
            .collect()
    }

    /// Acknowledge the active event with this id, if one exists. Leaves
    /// `state` as `ACTIVE` — acknowledgment doesn't end an event's
    /// lifecycle, it only flags it (spec.md §4.10).
    pub fn acknowledge(&self, event_id: &str, user: &str, at: DateTime<Utc>) -> Option<WarningEvent> {
        let mut inner = self.inner.lock();
        for runtime in inner.runtimes.values_mut() {
            if let Some(active) = runtime.active.as_mut() {
                if active.event_id == event_id {
                    active.acknowledge(user, at);
                    return Some(active.clone());
                }
            }
        }
        None
    }

    /// Replace the active configuration for every signal named in `configs`,
    /// keeping existing runtime histories (conservative reconfiguration:
    /// see DESIGN.md for the tradeoff against spec.md §9's documented
    /// "discard in-flight events" default).
    pub fn reconfigure(&self, configs: Vec<ThresholdConfig>) {
        let mut inner = self.inner.lock();
        inner.configs = configs.into_iter().map(|c| (c.signal_id.clone(), c)).collect();
    }

    pub fn check(&self, signal_id: &str, value: f64, ts: DateTime<Utc>) -> Option<WarningEvent> {
        let started = Instant::now();
        let result = self.check_inner(signal_id, value, ts);
        self.stats.record(started.elapsed());
        result
    }

    fn check_inner(&self, signal_id: &str, value: f64, ts: DateTime<Utc>) -> Option<WarningEvent> {
        let mut inner = self.inner.lock();
        let config = inner.configs.get(signal_id)?.clone();
        let runtime = inner
            .runtimes
            .entry(signal_id.to_string())
            .or_insert_with(SignalRuntime::default);

        match classify(value, &config) {
            Some((severity, threshold_kind, threshold_value, deviation)) => {
                push_bounded(
                    &mut runtime.trigger_history,
                    TriggerEntry {
                        ts,
                        value,
                        severity,
                        threshold_kind,
                        threshold_value,
                        deviation,
                    },
                );
                runtime.recovery_history.clear();
                evaluate_trigger(runtime, &config, signal_id)
            }
            None => {
                push_bounded(&mut runtime.recovery_history, RecoveryEntry { ts });
                if runtime.active.is_some() {
                    evaluate_recovery(runtime, &config, ts)
                } else {
                    None
                }
            }
        }
    }
}

fn push_bounded<T>(deque: &mut VecDeque<T>, item: T) {
    if deque.len() == MAX_HISTORY {
        deque.pop_front();
    }
    deque.push_back(item);
}

/// CRITICAL dominates WARNING; within a severity the bound with the larger
/// deviation wins (spec.md §3 invariants, §4.7 step 2).
fn classify(
    value: f64,
    config: &ThresholdConfig,
) -> Option<(EventSeverity, ThresholdKind, f64, f64)> {
    let mut critical = Vec::new();
    let mut warning = Vec::new();

    if let Some(max) = config.critical_max {
        if value > max {
            critical.push((ThresholdKind::Max, max, value - max));
        }
    }
    if let Some(min) = config.critical_min {
        if value < min {
            critical.push((ThresholdKind::Min, min, min - value));
        }
    }
    if let Some(max) = config.warning_max {
        if value > max {
            warning.push((ThresholdKind::Max, max, value - max));
        }
    }
    if let Some(min) = config.warning_min {
        if value < min {
            warning.push((ThresholdKind::Min, min, min - value));
        }
    }

    let pick = |mut v: Vec<(ThresholdKind, f64, f64)>| {
        v.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        v.into_iter().next()
    };

    if let Some((kind, threshold, deviation)) = pick(critical) {
        Some((EventSeverity::Critical, kind, threshold, deviation))
    } else {
        pick(warning).map(|(kind, threshold, deviation)| (EventSeverity::Warning, kind, threshold, deviation))
    }
}

fn prune_trigger_window(runtime: &mut SignalRuntime, now: DateTime<Utc>, window: std::time::Duration) {
    let cutoff = now - chrono::Duration::from_std(window).unwrap_or_default();
    while let Some(front) = runtime.trigger_history.front() {
        if front.ts < cutoff {
            runtime.trigger_history.pop_front();
        } else {
            break;
        }
    }
}

fn prune_recovery_window(runtime: &mut SignalRuntime, now: DateTime<Utc>, window: std::time::Duration) {
    let cutoff = now - chrono::Duration::from_std(window).unwrap_or_default();
    while let Some(front) = runtime.recovery_history.front() {
        if front.ts < cutoff {
            runtime.recovery_history.pop_front();
        } else {
            break;
        }
    }
}

fn evaluate_trigger(runtime: &mut SignalRuntime, config: &ThresholdConfig, signal_id: &str) -> Option<WarningEvent> {
    let now = runtime.trigger_history.back()?.ts;
    prune_trigger_window(runtime, now, config.trigger_window());

    if (runtime.trigger_history.len() as u32) < config.trigger_count {
        return None;
    }

    let latest = runtime.trigger_history.back()?.clone();

    if let Some(active) = runtime.active.as_mut() {
        active.trigger_count += 1;
        active.max_deviation = active.max_deviation.max(latest.deviation);
        active.values_during_event.push(latest.value);
        return None;
    }

    let oldest = runtime.trigger_history.front()?.clone();
    let max_deviation = runtime
        .trigger_history
        .iter()
        .map(|e| e.deviation)
        .fold(0.0, f64::max);
    let values_during_event: Vec<f64> = runtime.trigger_history.iter().map(|e| e.value).collect();

    let event = WarningEvent {
        event_id: WarningEvent::make_id(signal_id, oldest.ts),
        signal_id: signal_id.to_string(),
        signal_type: config.signal_type,
        severity: latest.severity,
        state: EventState::Active,
        threshold_type: latest.threshold_kind,
        threshold_value: latest.threshold_value,
        trigger_value: latest.value,
        first_trigger_time: oldest.ts,
        event_start_time: now,
        event_end_time: None,
        duration_s: None,
        trigger_count: runtime.trigger_history.len() as u32,
        max_deviation,
        values_during_event,
        message: format!(
            "{} {} violation on {}: value {:.4} exceeded {} by {:.4}",
            latest.severity, latest.threshold_kind, signal_id, latest.value, latest.threshold_value, latest.deviation
        ),
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
    };

    runtime.active = Some(event.clone());
    Some(event)
}

fn evaluate_recovery(runtime: &mut SignalRuntime, config: &ThresholdConfig, now: DateTime<Utc>) -> Option<WarningEvent> {
    prune_recovery_window(runtime, now, config.recovery_window());

    if (runtime.recovery_history.len() as u32) < config.recovery_count {
        return None;
    }

    let active = runtime.active.take()?;
    let duration_s = (now - active.event_start_time).num_milliseconds() as f64 / 1000.0;

    runtime.trigger_history.clear();
    runtime.recovery_history.clear();

    if duration_s < config.min_event_duration_s {
        tracing::debug!(signal_id = %active.signal_id, duration_s, "discarding short-lived event");
        return None;
    }

    let mut finalized = active;
    finalized.event_end_time = Some(now);
    finalized.duration_s = Some(duration_s);
    finalized.state = EventState::Recovered;
    finalized.message = format!("{} (recovered after {duration_s:.3}s)", finalized.message);
    Some(finalized)
}
