//! # Exporter Context
//!
//! The explicit application context built once at startup: beacon registry,
//! metric sink and zero-value policy. Both scheduler modes push every reading
//! through the same [`ExporterContext::process_reading`] path, which is what
//! keeps their observable metric state identical.

use std::sync::Arc;

use crate::engine::normalizer::{normalize_sensor_data, ZeroPolicy};
use crate::engine::registry::BeaconRegistry;
use crate::error::DataError;
use crate::exposition::MetricSink;
use crate::ingestors::{SensorData, Snapshot};

#[derive(Clone)]
pub struct ExporterContext {
    pub registry: Arc<BeaconRegistry>,
    pub sink: Arc<dyn MetricSink>,
    pub zero_policy: ZeroPolicy,
}

impl ExporterContext {
    pub fn new(registry: Arc<BeaconRegistry>, sink: Arc<dyn MetricSink>, zero_policy: ZeroPolicy) -> Self {
        Self {
            registry,
            sink,
            zero_policy,
        }
    }

    /// Validates, normalizes and publishes one device's payload. Returns the
    /// number of gauges updated.
    pub fn process_reading(&self, device_id: &str, data: &SensorData) -> Result<usize, DataError> {
        let metrics = normalize_sensor_data(&self.registry, device_id, data, self.zero_policy)?;
        for metric in &metrics {
            log::debug!("{}{{location=\"{}\"}} = {}", metric.metric_kind, metric.label, metric.value);
            self.sink.publish(metric);
        }
        Ok(metrics.len())
    }

    /// Processes every device in a snapshot. A malformed reading is logged and
    /// skipped; the remaining devices still publish.
    pub fn process_snapshot(&self, snapshot: &Snapshot) -> usize {
        let mut published = 0;
        for (device_id, data) in snapshot {
            match self.process_reading(device_id, data) {
                Ok(count) => published += count,
                Err(e) => log::error!("Skipping {}: {}", device_id, e),
            }
        }
        published
    }
}
