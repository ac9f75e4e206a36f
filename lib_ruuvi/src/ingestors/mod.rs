//! # Sensor Ingestors
//!
//! The wireless protocol stack is an external collaborator. This module
//! describes the two shapes in which it hands data to the exporter, and
//! provides one concrete implementation fed by a line-oriented advertisement
//! stream.
//!
//! - **`SnapshotSource`**: pull one snapshot covering a set of devices,
//!   bounded by a timeout. Used by polling mode.
//! - **`EventSource`**: register a callback invoked once per advertisement.
//!   Used by push mode.
//!
//! ## Contained Modules:
//! - **`decoder`**: manufacturer data payload decoding (formats 3 and 5).
//! - **`line_source`**: a source reading `<device_id> <hex>` lines from stdin
//!   or from an external scanner process.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;

/// Advertisement payload decoding.
pub mod decoder;
/// Line-oriented advertisement feed implementing both source shapes.
pub mod line_source;

pub use line_source::LineSource;

/// One device's payload: `{metric: value}` in raw sensor units.
pub type SensorData = BTreeMap<String, f64>;

/// One fetch's worth of readings: `{device_id: {metric: value}}`.
pub type Snapshot = BTreeMap<String, SensorData>;

/// Callback invoked by an [`EventSource`] for each incoming advertisement.
pub type ReadingHandler = Arc<dyn Fn(&str, &SensorData) + Send + Sync>;

/// A source that can be asked for the current readings of a set of devices.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Collects readings for `device_ids`, giving up after `timeout`.
    /// Devices that did not report in time are simply absent.
    async fn fetch(&self, device_ids: &[String], timeout: Duration) -> Result<Snapshot, SourceError>;
}

/// A source that pushes readings to a registered handler as they arrive.
pub trait EventSource: Send + Sync {
    /// Registers `handler`. The source decides which execution context the
    /// handler runs on and keeps delivering until it is itself shut down.
    fn subscribe(&self, handler: ReadingHandler) -> Result<(), SourceError>;
}
