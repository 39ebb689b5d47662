//! Time-Series Store Gateway (C1, spec.md §6).
//!
//! Abstracts read/write of measurement points behind [`TimeSeriesStore`].
//! [`HttpTimeSeriesStore`] talks InfluxDB v1 line protocol / InfluxQL over
//! `reqwest`; [`InMemoryStore`] backs tests and local runs without a real
//! store. This crate does not expose the outward-facing HTTP query surface
//! other collaborators build on top of it — it is the client, not the API.

mod error;
mod http;
mod memory;
mod point;
mod store;

pub use error::{TsdbError, TsdbResult};
pub use http::HttpTimeSeriesStore;
pub use memory::InMemoryStore;
pub use point::{FieldValue, Point};
pub use store::TimeSeriesStore;
