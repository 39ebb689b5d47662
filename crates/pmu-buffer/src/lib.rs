//! Ring buffer store (C2): bounded per-signal history used as the input
//! window for FFT, oscillation, SNR and fault analysis.
//!
//! One [`parking_lot::Mutex`]-guarded [`VecDeque`] per signal, held in a
//! [`DashMap`] so signals don't contend with each other — the same
//! per-entity-lock shape `palm-health::monitor::HealthMonitor` uses for its
//! `DashMap<InstanceId, _>` state.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Default capacity per signal (spec.md §3, §4.1).
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedValue {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

struct SignalBuffer {
    capacity: usize,
    values: VecDeque<TimedValue>,
}

impl SignalBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, item: TimedValue) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(item);
    }
}

/// Bounded ring-buffer store keyed by `signal_id`.
pub struct RingBufferStore {
    capacity: usize,
    buffers: DashMap<String, Mutex<SignalBuffer>>,
}

impl RingBufferStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffers: DashMap::new(),
        }
    }

    /// Append one sample. O(1): evicts the oldest entry when the per-signal
    /// buffer is already at capacity.
    pub fn append(&self, signal_id: &str, timestamp: DateTime<Utc>, value: f64) {
        let entry = self
            .buffers
            .entry(signal_id.to_string())
            .or_insert_with(|| Mutex::new(SignalBuffer::new(self.capacity)));
        entry.lock().push(TimedValue { timestamp, value });
    }

    /// A consistent, dense copy of the signal's current buffer contents in
    /// insertion order. Taken under the per-signal lock; the lock is
    /// released before the caller runs any analysis over the copy, so
    /// analyses never block ingestion.
    pub fn snapshot(&self, signal_id: &str) -> Vec<TimedValue> {
        match self.buffers.get(signal_id) {
            Some(buf) => buf.lock().values.iter().copied().collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self, signal_id: &str) -> usize {
        self.buffers
            .get(signal_id)
            .map(|b| b.lock().values.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, signal_id: &str) -> bool {
        self.len(signal_id) == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RingBufferStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(i: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(i, 0).unwrap()
    }

    #[test]
    fn len_is_min_of_appends_and_capacity() {
        let store = RingBufferStore::new(4);
        for i in 0..10 {
            store.append("S1", ts(i), i as f64);
        }
        assert_eq!(store.len("S1"), 4);
    }

    #[test]
    fn snapshot_preserves_insertion_order_and_keeps_suffix() {
        let store = RingBufferStore::new(3);
        for i in 0..5 {
            store.append("S1", ts(i), i as f64);
        }
        let snap = store.snapshot("S1");
        let values: Vec<f64> = snap.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn unknown_signal_snapshot_is_empty() {
        let store = RingBufferStore::new(4);
        assert!(store.snapshot("ghost").is_empty());
        assert_eq!(store.len("ghost"), 0);
    }

    #[test]
    fn signals_do_not_share_state() {
        let store = RingBufferStore::new(4);
        store.append("A", ts(0), 1.0);
        store.append("B", ts(0), 2.0);
        assert_eq!(store.len("A"), 1);
        assert_eq!(store.len("B"), 1);
        assert_eq!(store.snapshot("A")[0].value, 1.0);
        assert_eq!(store.snapshot("B")[0].value, 2.0);
    }
}
