//! Shared fixtures for the integration tests in `tests/`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lib_ruuvi::ingestors::ReadingHandler;
use lib_ruuvi::{
    BeaconRegistry, EventSource, ExporterContext, MetricSink, SensorData, Snapshot, SnapshotSource,
    SourceError, ZeroPolicy,
};

/// Beacon mapping with one known device.
pub const KITCHEN_CONFIG: &str = r#"{"AA:BB": {"name": "kitchen"}}"#;

/// A RAWv2 advertisement: 24.3 °C, 53.49 %, 1000.44 hPa, 2.977 V.
pub const RAWV2_HEX: &str = "0512FC5394C37C0004FFFC040CAC364200CDCBB8334C884F";

/// Builds a raw payload in source units (°C, centipercent, hPa, mV).
pub fn reading(temperature: f64, humidity: f64, pressure: f64, battery: f64) -> SensorData {
    [
        ("temperature".to_string(), temperature),
        ("humidity".to_string(), humidity),
        ("pressure".to_string(), pressure),
        ("battery".to_string(), battery),
    ]
    .into_iter()
    .collect()
}

pub fn context(config_json: &str, sink: Arc<dyn MetricSink>, policy: ZeroPolicy) -> ExporterContext {
    let registry = BeaconRegistry::from_json(config_json).expect("fixture config must parse");
    ExporterContext::new(Arc::new(registry), sink, policy)
}

/// Replays a fixed sequence of advertisements through either source shape.
///
/// As a snapshot source it reports the latest reading per requested device;
/// as an event source it delivers every advertisement in order, synchronously.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    events: Vec<(String, SensorData)>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = (String, SensorData)>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self, device_ids: &[String], _timeout: Duration) -> Result<Snapshot, SourceError> {
        let mut snapshot = Snapshot::new();
        for (device_id, data) in &self.events {
            if device_ids.contains(device_id) {
                snapshot.insert(device_id.clone(), data.clone());
            }
        }
        Ok(snapshot)
    }
}

impl EventSource for ScriptedSource {
    fn subscribe(&self, handler: ReadingHandler) -> Result<(), SourceError> {
        for (device_id, data) in &self.events {
            handler(device_id, data);
        }
        Ok(())
    }
}
