//! Warning Storage Layer (C9, spec.md §4.8): async batched persistence and
//! historical query, modeled on the background-loop shape used by the
//! scheduler crate's reconciliation loop (`running` flag + `tokio::select!`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pmu_tsdb::{FieldValue, Point, TimeSeriesStore};
use pmu_types::{EventSeverity, EventState, WarningEvent};

const WARNING_EVENTS_MEASUREMENT: &str = "warning_events";
const WARNING_RECOVERIES_MEASUREMENT: &str = "warning_recoveries";

/// Default drain period `I` (spec.md §4.8).
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct WarningStore {
    queue: Mutex<Vec<WarningEvent>>,
    store: Arc<dyn TimeSeriesStore>,
    database: String,
    running: AtomicBool,
}

impl WarningStore {
    pub fn new(store: Arc<dyn TimeSeriesStore>, database: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            store,
            database: database.into(),
            running: AtomicBool::new(false),
        }
    }

    /// Enqueue one event. Called from [`crate::engine::ThresholdEngine`]'s
    /// state-change callback; never blocks on I/O.
    pub fn enqueue(&self, event: WarningEvent) {
        self.queue.lock().push(event);
    }

    /// Spawn the background drain loop. Returns the join handle so the
    /// caller (the warning manager) can await it during shutdown.
    pub fn spawn_drain_loop(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.drain_once().await;
            }
            // Final flush on shutdown (spec.md §5 cancellation & shutdown).
            self.drain_once().await;
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn drain_once(&self) {
        let batch = {
            let mut queue = self.queue.lock();
            std::mem::take(&mut *queue)
        };
        if batch.is_empty() {
            return;
        }

        let points: Vec<Point> = batch.iter().flat_map(event_to_points).collect();
        if let Err(e) = self.store.write_points(&self.database, points).await {
            tracing::error!(error = %e, batch_len = batch.len(), "warning batch write failed, retaining for next cycle");
            self.queue.lock().extend(batch);
        }
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
        let mut tag_filters = Vec::new();
        if let Some(signal_id) = signal_id {
            tag_filters.push(("signal_id".to_string(), signal_id.to_string()));
        }
        if let Some(severity) = severity {
            tag_filters.push(("severity".to_string(), severity.to_string()));
        }
        if let Some(state) = state {
            tag_filters.push(("state".to_string(), state.to_string()));
        }

        match self
            .store
            .query_range(&self.database, WARNING_EVENTS_MEASUREMENT, start, end, &tag_filters, limit)
            .await
        {
            Ok(points) => points.iter().filter_map(hydrate_event).collect(),
            Err(e) => {
                tracing::error!(error = %e, "warning history query failed");
                Vec::new()
            }
        }
    }
}

fn event_to_points(event: &WarningEvent) -> Vec<Point> {
    let event_json = serde_json::to_string(event).unwrap_or_default();
    // `event_start_time` is always set once an event exists (spec.md §4.8's
    // "or, when null, first_trigger_time" describes the source's optional
    // dictionary field; our typed model has no such gap).
    let time = event.event_start_time;

    let mut points = vec![Point::new(WARNING_EVENTS_MEASUREMENT, time)
        .with_tag("event_id", event.event_id.clone())
        .with_tag("signal_id", event.signal_id.clone())
        .with_tag("signal_type", event.signal_type.to_string())
        .with_tag("severity", event.severity.to_string())
        .with_tag("state", event.state.to_string())
        .with_field("threshold_type", FieldValue::Str(event.threshold_type.to_string()))
        .with_field("threshold_value", FieldValue::Float(event.threshold_value))
        .with_field("trigger_value", FieldValue::Float(event.trigger_value))
        .with_field("trigger_count", FieldValue::Int(event.trigger_count as i64))
        .with_field("max_deviation", FieldValue::Float(event.max_deviation))
        .with_field("duration", FieldValue::Float(event.duration_s.unwrap_or(0.0)))
        .with_field("message", FieldValue::Str(event.message.clone()))
        .with_field("acknowledged", FieldValue::Bool(event.acknowledged))
        .with_field("event_json", FieldValue::Str(event_json))];

    if let Some(end_time) = event.event_end_time {
        points.push(
            Point::new(WARNING_RECOVERIES_MEASUREMENT, end_time)
                .with_tag("event_id", event.event_id.clone())
                .with_tag("signal_id", event.signal_id.clone())
                .with_field("duration", FieldValue::Float(event.duration_s.unwrap_or(0.0)))
                .with_field("recovery_time", FieldValue::Str(end_time.to_rfc3339())),
        );
    }

    points
}

fn hydrate_event(point: &Point) -> Option<WarningEvent> {
    match point.fields.get("event_json") {
        Some(FieldValue::Str(json)) => serde_json::from_str(json).ok(),
        _ => None,
    }
}
