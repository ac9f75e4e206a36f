//! # Prometheus Sink
//!
//! Four `GaugeVec`s registered once, at construction, in a registry owned by
//! the sink (no process-global registry). The `prometheus` gauges are
//! internally atomic, so `set` needs no extra locking.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::engine::normalizer::MetricKind;
use crate::error::SinkError;
use crate::exposition::{MetricSink, LOCATION_LABEL};

pub struct PrometheusSink {
    registry: Registry,
    temperature: GaugeVec,
    humidity: GaugeVec,
    pressure: GaugeVec,
    battery: GaugeVec,
}

impl PrometheusSink {
    /// Creates and registers the four gauges.
    pub fn new() -> Result<Self, SinkError> {
        let registry = Registry::new();
        let gauge = |kind: MetricKind| -> Result<GaugeVec, SinkError> {
            let vec = GaugeVec::new(Opts::new(kind.metric_name(), kind.help()), &[LOCATION_LABEL])?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };

        Ok(Self {
            temperature: gauge(MetricKind::Temperature)?,
            humidity: gauge(MetricKind::Humidity)?,
            pressure: gauge(MetricKind::Pressure)?,
            battery: gauge(MetricKind::Battery)?,
            registry,
        })
    }

    fn gauge(&self, kind: MetricKind) -> &GaugeVec {
        match kind {
            MetricKind::Temperature => &self.temperature,
            MetricKind::Humidity => &self.humidity,
            MetricKind::Pressure => &self.pressure,
            MetricKind::Battery => &self.battery,
        }
    }

    /// Current value of one series, if it has ever been set.
    pub fn value(&self, kind: MetricKind, label: &str) -> Option<f64> {
        self.registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == kind.metric_name())?
            .get_metric()
            .iter()
            .find(|metric| metric.get_label().iter().any(|pair| pair.get_value() == label))
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Encodes the whole registry in the text exposition format.
    pub fn render(&self) -> Result<String, SinkError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| SinkError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| SinkError::Encode(e.to_string()))
    }

    /// Content type of [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl MetricSink for PrometheusSink {
    fn set(&self, kind: MetricKind, label: &str, value: f64) {
        self.gauge(kind).with_label_values(&[label]).set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let sink = PrometheusSink::new().unwrap();
        sink.set(MetricKind::Temperature, "kitchen", 21.5);
        sink.set(MetricKind::Temperature, "kitchen", 21.5);
        assert_eq!(sink.value(MetricKind::Temperature, "kitchen"), Some(21.5));

        sink.set(MetricKind::Temperature, "kitchen", 19.0);
        assert_eq!(sink.value(MetricKind::Temperature, "kitchen"), Some(19.0));
    }

    #[test]
    fn test_unset_series_is_absent() {
        let sink = PrometheusSink::new().unwrap();
        sink.set(MetricKind::Humidity, "kitchen", 45.3);
        assert_eq!(sink.value(MetricKind::Battery, "kitchen"), None);
        assert!(!sink.render().unwrap().contains("ruuvi_battery_v{"));
    }

    #[test]
    fn test_render_text_format() {
        let sink = PrometheusSink::new().unwrap();
        sink.set(MetricKind::Pressure, "kitchen", 1013.0);
        let text = sink.render().unwrap();
        assert!(text.contains("# HELP ruuvi_pressure_hpa Air pressure hPa"));
        assert!(text.contains("# TYPE ruuvi_pressure_hpa gauge"));
        assert!(text.contains(r#"ruuvi_pressure_hpa{location="kitchen"} 1013"#));
    }
}
