use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// One field value in a [`Point`]. Time-series stores are typically typed
/// per field (float/int/string/bool); we keep that distinction rather than
/// collapsing everything to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{v}"),
            FieldValue::Int(v) => format!("{v}i"),
            FieldValue::Str(v) => format!("\"{}\"", v.replace('"', "\\\"")),
            FieldValue::Bool(v) => v.to_string(),
        }
    }
}

/// A single `(measurement, tags, fields, time)` point, the unit the
/// time-series store contract (spec.md §6) trades in.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// InfluxDB line protocol encoding: `measurement,tag=v field=v time`.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_identifier(&self.measurement);
        for (k, v) in &self.tags {
            line.push(',');
            line.push_str(&escape_identifier(k));
            line.push('=');
            line.push_str(&escape_identifier(v));
        }
        line.push(' ');
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", escape_identifier(k), v.line_protocol()))
            .collect();
        line.push_str(&fields.join(","));
        line.push(' ');
        line.push_str(&self.time.timestamp_nanos_opt().unwrap_or_default().to_string());
        line
    }
}

fn escape_identifier(s: &str) -> String {
    s.replace(' ', "\\ ").replace(',', "\\,").replace('=', "\\=")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_protocol_includes_tags_and_fields() {
        let t = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let p = Point::new("fft_summary", t)
            .with_tag("signal_id", "F1")
            .with_field("dominant_freq", FieldValue::Float(3.0));
        let line = p.to_line_protocol();
        assert!(line.starts_with("fft_summary,signal_id=F1 "));
        assert!(line.contains("dominant_freq=3"));
    }

    #[test]
    fn identifiers_with_spaces_are_escaped() {
        assert_eq!(escape_identifier("a b"), "a\\ b");
    }
}
