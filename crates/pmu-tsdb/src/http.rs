//! HTTP time-series store client (InfluxDB v1 line protocol + InfluxQL),
//! grounded in the source system's `fake_writer.py`/`check_fft_data.py`
//! usage of `InfluxDBClient.write_points` / `.query`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pmu_types::Sample;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{TsdbError, TsdbResult};
use crate::point::{FieldValue, Point};
use crate::store::TimeSeriesStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpTimeSeriesStore {
    client: Client,
    base_url: String,
}

impl HttpTimeSeriesStore {
    pub fn new(host: &str, port: u16) -> TsdbResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}"),
        })
    }
}

#[async_trait]
impl TimeSeriesStore for HttpTimeSeriesStore {
    async fn write_points(&self, database: &str, points: Vec<Point>) -> TsdbResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body = points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .client
            .post(format!("{}/write", self.base_url))
            .query(&[("db", database)])
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TsdbError::UnexpectedResponse(format!(
                "write to {database} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn read_recent_samples(
        &self,
        database: &str,
        signal_id: &str,
        limit: usize,
    ) -> TsdbResult<Vec<Sample>> {
        let q = format!(
            "SELECT value FROM \"{signal_id}\" ORDER BY time DESC LIMIT {limit}"
        );
        let mut samples: Vec<Sample> = self
            .run_query(database, &q)
            .await?
            .into_iter()
            .filter_map(|p| p.fields.get("value").and_then(FieldValue::as_f64).map(|v| Sample::new(signal_id, p.time, v)))
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
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
        let mut q = format!(
            "SELECT * FROM \"{measurement}\" WHERE time >= '{}' AND time <= '{}'",
            start.to_rfc3339(),
            end.to_rfc3339()
        );
        for (k, v) in tag_filters {
            q.push_str(&format!(" AND \"{k}\" = '{v}'"));
        }
        q.push_str(" ORDER BY time DESC");
        if let Some(limit) = limit {
            q.push_str(&format!(" LIMIT {limit}"));
        }
        let mut points = self.run_query(database, &q).await?;
        points.retain(|p| p.measurement == measurement);
        Ok(points)
    }
}

impl HttpTimeSeriesStore {
    async fn run_query(&self, database: &str, query: &str) -> TsdbResult<Vec<Point>> {
        let response = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[("db", database), ("q", query)])
            .send()
            .await?
            .json::<InfluxQueryResponse>()
            .await?;
        response.into_points()
    }
}

#[derive(Debug, Deserialize)]
struct InfluxQueryResponse {
    results: Vec<InfluxResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxResult {
    #[serde(default)]
    series: Vec<InfluxSeries>,
}

#[derive(Debug, Deserialize)]
struct InfluxSeries {
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxQueryResponse {
    fn into_points(self) -> TsdbResult<Vec<Point>> {
        let mut points = Vec::new();
        for result in self.results {
            for series in result.series {
                let time_idx = series
                    .columns
                    .iter()
                    .position(|c| c == "time")
                    .ok_or_else(|| TsdbError::UnexpectedResponse("missing time column".into()))?;
                for row in series.values {
                    let time_raw = row
                        .get(time_idx)
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| TsdbError::UnexpectedResponse("non-string time value".into()))?;
                    let time = DateTime::parse_from_rfc3339(time_raw)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap());

                    let mut point = Point::new(series.name.clone(), time);
                    for (k, v) in &series.tags {
                        point = point.with_tag(k.clone(), v.clone());
                    }
                    for (i, col) in series.columns.iter().enumerate() {
                        if i == time_idx {
                            continue;
                        }
                        if let Some(value) = row.get(i) {
                            if let Some(field) = json_to_field(value) {
                                point = point.with_field(col.clone(), field);
                            }
                        }
                    }
                    points.push(point);
                }
            }
        }
        Ok(points)
    }
}

fn json_to_field(value: &serde_json::Value) -> Option<FieldValue> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Float),
        serde_json::Value::String(s) => Some(FieldValue::Str(s.clone())),
        serde_json::Value::Bool(b) => Some(FieldValue::Bool(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_strips_trailing_formatting() {
        let store = HttpTimeSeriesStore::new("127.0.0.1", 8086).unwrap();
        assert_eq!(store.base_url, "http://127.0.0.1:8086");
    }
}
