use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmu_types::Sample;

use crate::error::TsdbResult;
use crate::point::Point;

/// Abstract read/write access to measurement points (C1, spec.md §6).
///
/// Each loop in the workspace (the analysis scheduler, the warning writer)
/// holds its own private client — implementations must be cheap to clone
/// or otherwise shareable across an `Arc`.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Write a batch of points into `database`. Implementations should
    /// treat this as a single logical write: partial failure is reported
    /// as an error, not silently dropped.
    async fn write_points(&self, database: &str, points: Vec<Point>) -> TsdbResult<()>;

    /// The most recent `limit` samples for `signal_id`, oldest first.
    async fn read_recent_samples(
        &self,
        database: &str,
        signal_id: &str,
        limit: usize,
    ) -> TsdbResult<Vec<Sample>>;

    /// Points from `measurement` in `[start, end]`, optionally filtered by
    /// exact tag match, newest first, capped at `limit`.
    async fn query_range(
        &self,
        database: &str,
        measurement: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tag_filters: &[(String, String)],
        limit: Option<usize>,
    ) -> TsdbResult<Vec<Point>>;
}
