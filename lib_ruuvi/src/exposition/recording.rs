use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::engine::normalizer::MetricKind;
use crate::exposition::MetricSink;

/// Keeps the last value per `(kind, label)` in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    values: Mutex<BTreeMap<(MetricKind, String), f64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BTreeMap<(MetricKind, String), f64> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, kind: MetricKind, label: &str) -> Option<f64> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, label.to_string()))
            .copied()
    }
}

impl MetricSink for RecordingSink {
    fn set(&self, kind: MetricKind, label: &str, value: f64) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, label.to_string()), value);
    }
}
