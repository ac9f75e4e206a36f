//! # Metric Exposition
//!
//! The sink side of the exporter. Producers only see the [`MetricSink`]
//! trait; gauge semantics (last write wins, no accumulation) and thread
//! safety are the implementation's responsibility.
//!
//! ## Contained Modules:
//! - **`gauges`**: `PrometheusSink`, a private registry of four labelled gauges.
//! - **`recording`**: `RecordingSink`, an in-memory sink for tests and comparisons.
//! - **`http`**: the scrape listener serving `GET /metrics`.

use crate::engine::normalizer::{MetricKind, NormalizedMetric};

/// Labelled gauges backed by the `prometheus` crate.
pub mod gauges;
/// The scrape endpoint.
pub mod http;
/// In-memory sink.
pub mod recording;

pub use gauges::PrometheusSink;
pub use recording::RecordingSink;

/// Name of the single label every exported gauge carries.
pub const LOCATION_LABEL: &str = "location";

/// Destination for normalized values. Must tolerate concurrent callers.
pub trait MetricSink: Send + Sync {
    /// Sets the current value of `kind` for `label`, overwriting any previous value.
    fn set(&self, kind: MetricKind, label: &str, value: f64);

    /// Publishes one normalized metric.
    fn publish(&self, metric: &NormalizedMetric) {
        self.set(metric.metric_kind, &metric.label, metric.value);
    }
}
