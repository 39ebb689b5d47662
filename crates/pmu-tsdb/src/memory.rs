//! In-memory [`TimeSeriesStore`] used by tests and local development, so the
//! scheduler and warning writer can run without a real time-series store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pmu_types::Sample;

use crate::error::TsdbResult;
use crate::point::Point;
use crate::store::TimeSeriesStore;

#[derive(Default)]
pub struct InMemoryStore {
    points: Mutex<Vec<(String, Point)>>,
    samples: Mutex<Vec<(String, Sample)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed sample data for a `(database, signal_id)` pair, as the
    /// ingestion adapter would have already written it.
    pub fn seed_sample(&self, database: &str, sample: Sample) {
        self.samples.lock().push((database.to_string(), sample));
    }

    pub fn all_points(&self, database: &str) -> Vec<Point> {
        self.points
            .lock()
            .iter()
            .filter(|(db, _)| db == database)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl TimeSeriesStore for InMemoryStore {
    async fn write_points(&self, database: &str, points: Vec<Point>) -> TsdbResult<()> {
        let mut guard = self.points.lock();
        for p in points {
            guard.push((database.to_string(), p));
        }
        Ok(())
    }

    async fn read_recent_samples(
        &self,
        database: &str,
        signal_id: &str,
        limit: usize,
    ) -> TsdbResult<Vec<Sample>> {
        let guard = self.samples.lock();
        let mut matching: Vec<Sample> = guard
            .iter()
            .filter(|(db, s)| db == database && s.signal_id == signal_id)
            .map(|(_, s)| s.clone())
            .collect();
        matching.sort_by_key(|s| s.timestamp);
        if matching.len() > limit {
            matching = matching.split_off(matching.len() - limit);
        }
        Ok(matching)
    }

    async fn query_range(
        &self,
        database: &str,
        measurement: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tag_filters: &[(String, String)],
        limit: Option<usize>,
    ) -> TsdbResult<Vec<Point>> {
        let guard = self.points.lock();
        let mut matching: Vec<Point> = guard
            .iter()
            .filter(|(db, p)| {
                db == database
                    && p.measurement == measurement
                    && p.time >= start
                    && p.time <= end
                    && tag_filters
                        .iter()
                        .all(|(k, v)| p.tags.get(k).map(|tv| tv == v).unwrap_or(false))
            })
            .map(|(_, p)| p.clone())
            .collect();
        matching.sort_by(|a, b| b.time.cmp(&a.time));
        if let Some(limit) = limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FieldValue;

    fn ts(i: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(i, 0).unwrap()
    }

    #[tokio::test]
    async fn read_recent_samples_returns_oldest_first_capped_at_limit() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.seed_sample("pmu_data", Sample::new("F1", ts(i), i as f64));
        }
        let got = store.read_recent_samples("pmu_data", "F1", 3).await.unwrap();
        let values: Vec<f64> = got.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn query_range_filters_by_tag_and_time() {
        let store = InMemoryStore::new();
        let p1 = Point::new("fft_summary", ts(5))
            .with_tag("signal_id", "F1")
            .with_field("dominant_freq", FieldValue::Float(3.0));
        let p2 = Point::new("fft_summary", ts(15))
            .with_tag("signal_id", "F2")
            .with_field("dominant_freq", FieldValue::Float(4.0));
        store.write_points("pmu_analysis", vec![p1, p2]).await.unwrap();

        let got = store
            .query_range(
                "pmu_analysis",
                "fft_summary",
                ts(0),
                ts(10),
                &[("signal_id".to_string(), "F1".to_string())],
                None,
            )
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].tags.get("signal_id").unwrap(), "F1");
    }
}
