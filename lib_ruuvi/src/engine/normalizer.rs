//! # Reading Normalizer
//!
//! Turns one raw sensor payload into the fixed metric vocabulary:
//!
//! | field         | raw unit     | published unit | conversion |
//! |---------------|--------------|----------------|------------|
//! | `temperature` | °C           | °C             | none       |
//! | `humidity`    | centipercent | %              | ÷ 100      |
//! | `pressure`    | hPa          | hPa            | none       |
//! | `battery`     | mV           | V              | ÷ 1000     |
//!
//! A converted value of exactly zero is read as "the sensor did not report
//! this field" and is dropped, unless the [`ZeroPolicy`] says otherwise.
//! The normalizer holds no state; it is a pure function of its inputs and
//! registry lookups.

use std::fmt;

use crate::engine::registry::BeaconRegistry;
use crate::error::DataError;
use crate::ingestors::SensorData;

/// Payload key for temperature.
pub const FIELD_TEMPERATURE: &str = "temperature";
/// Payload key for humidity.
pub const FIELD_HUMIDITY: &str = "humidity";
/// Payload key for pressure.
pub const FIELD_PRESSURE: &str = "pressure";
/// Payload key for battery voltage.
pub const FIELD_BATTERY: &str = "battery";

/// The four exported gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    /// `ruuvi_temperature_c`
    Temperature,
    /// `ruuvi_humidity_percent`
    Humidity,
    /// `ruuvi_pressure_hpa`
    Pressure,
    /// `ruuvi_battery_v`
    Battery,
}

impl MetricKind {
    /// Every kind, in exposition order.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Pressure,
        MetricKind::Battery,
    ];

    /// Exposed metric name.
    pub fn metric_name(self) -> &'static str {
        match self {
            MetricKind::Temperature => "ruuvi_temperature_c",
            MetricKind::Humidity => "ruuvi_humidity_percent",
            MetricKind::Pressure => "ruuvi_pressure_hpa",
            MetricKind::Battery => "ruuvi_battery_v",
        }
    }

    /// HELP text for the exposition format.
    pub fn help(self) -> &'static str {
        match self {
            MetricKind::Temperature => "Temperature in Celsius",
            MetricKind::Humidity => "Humidity %",
            MetricKind::Pressure => "Air pressure hPa",
            MetricKind::Battery => "Battery V",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// What to do with a converted value of exactly `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroPolicy {
    /// Treat zero as "field not reported" and skip it.
    #[default]
    Suppress,
    /// Publish zero like any other value.
    Keep,
}

/// One device's sample in raw sensor units.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub device_id: String,
    /// °C
    pub temperature_raw: f64,
    /// Centipercent (percent × 100).
    pub humidity_raw: f64,
    /// hPa
    pub pressure_raw: f64,
    /// Millivolts.
    pub battery_raw: f64,
}

impl RawReading {
    /// Validates a `{metric: value}` payload. Every field must be present and
    /// finite; otherwise the whole reading is rejected.
    pub fn from_sensor_data(device_id: &str, data: &SensorData) -> Result<Self, DataError> {
        let field = |name: &'static str| -> Result<f64, DataError> {
            let value = *data.get(name).ok_or_else(|| DataError::MissingField {
                device_id: device_id.to_string(),
                field: name,
            })?;
            if !value.is_finite() {
                return Err(DataError::NonFinite {
                    device_id: device_id.to_string(),
                    field: name,
                    value,
                });
            }
            Ok(value)
        };

        Ok(Self {
            device_id: device_id.to_string(),
            temperature_raw: field(FIELD_TEMPERATURE)?,
            humidity_raw: field(FIELD_HUMIDITY)?,
            pressure_raw: field(FIELD_PRESSURE)?,
            battery_raw: field(FIELD_BATTERY)?,
        })
    }

    /// The value for `kind`, converted to its published unit.
    pub fn converted(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Temperature => self.temperature_raw,
            MetricKind::Humidity => self.humidity_raw / 100.0,
            MetricKind::Pressure => self.pressure_raw,
            MetricKind::Battery => self.battery_raw / 1000.0,
        }
    }
}

/// A validated value ready for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetric {
    /// Resolved display label.
    pub label: String,
    pub metric_kind: MetricKind,
    pub value: f64,
}

/// Normalizes a validated reading. Yields at most four metrics, lazily.
pub fn normalize(
    registry: &BeaconRegistry,
    raw: &RawReading,
    policy: ZeroPolicy,
) -> impl Iterator<Item = NormalizedMetric> {
    let label = registry.resolve(&raw.device_id).to_string();
    let raw = raw.clone();
    MetricKind::ALL.into_iter().filter_map(move |kind| {
        let value = raw.converted(kind);
        if policy == ZeroPolicy::Suppress && value == 0.0 {
            return None;
        }
        Some(NormalizedMetric {
            label: label.clone(),
            metric_kind: kind,
            value,
        })
    })
}

/// Validates a raw payload and normalizes it in one step.
pub fn normalize_sensor_data(
    registry: &BeaconRegistry,
    device_id: &str,
    data: &SensorData,
    policy: ZeroPolicy,
) -> Result<Vec<NormalizedMetric>, DataError> {
    let raw = RawReading::from_sensor_data(device_id, data)?;
    Ok(normalize(registry, &raw, policy).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: f64, h: f64, p: f64, b: f64) -> RawReading {
        RawReading {
            device_id: "AA:BB".into(),
            temperature_raw: t,
            humidity_raw: h,
            pressure_raw: p,
            battery_raw: b,
        }
    }

    fn kitchen() -> BeaconRegistry {
        BeaconRegistry::from_json(r#"{"AA:BB": {"name": "kitchen"}}"#).unwrap()
    }

    #[test]
    fn test_kitchen_scenario() {
        let metrics: Vec<_> = normalize(
            &kitchen(),
            &reading(21.5, 4530.0, 1013.0, 2950.0),
            ZeroPolicy::Suppress,
        )
        .collect();

        assert_eq!(metrics.len(), 4);
        assert!(metrics.iter().all(|m| m.label == "kitchen"));
        assert_eq!(metrics[0].value, 21.5);
        assert!((metrics[1].value - 45.3).abs() < 1e-9);
        assert_eq!(metrics[2].value, 1013.0);
        assert!((metrics[3].value - 2.95).abs() < 1e-9);
    }

    #[test]
    fn test_zero_fields_are_suppressed() {
        let kinds: Vec<_> = normalize(
            &kitchen(),
            &reading(0.0, 4530.0, 0.0, 0.0),
            ZeroPolicy::Suppress,
        )
        .map(|m| m.metric_kind)
        .collect();
        assert_eq!(kinds, vec![MetricKind::Humidity]);
    }

    #[test]
    fn test_zero_fields_kept_when_configured() {
        let metrics: Vec<_> =
            normalize(&kitchen(), &reading(0.0, 0.0, 0.0, 0.0), ZeroPolicy::Keep).collect();
        assert_eq!(metrics.len(), 4);
        assert!(metrics.iter().all(|m| m.value == 0.0));
    }

    #[test]
    fn test_unregistered_device_uses_raw_id() {
        let mut raw = reading(5.0, 100.0, 990.0, 3000.0);
        raw.device_id = "CC:DD".into();
        let metric = normalize(&kitchen(), &raw, ZeroPolicy::Suppress).next().unwrap();
        assert_eq!(metric.label, "CC:DD");
    }

    #[test]
    fn test_negative_values_pass_through() {
        let metric = normalize(&kitchen(), &reading(-12.25, 0.0, 0.0, 0.0), ZeroPolicy::Suppress)
            .next()
            .unwrap();
        assert_eq!(metric.metric_kind, MetricKind::Temperature);
        assert_eq!(metric.value, -12.25);
    }

    #[test]
    fn test_missing_field_is_data_error() {
        let data: SensorData = [("temperature".to_string(), 20.0), ("humidity".to_string(), 1.0)]
            .into_iter()
            .collect();
        let err = normalize_sensor_data(&kitchen(), "AA:BB", &data, ZeroPolicy::Suppress).unwrap_err();
        assert_eq!(
            err,
            DataError::MissingField {
                device_id: "AA:BB".into(),
                field: FIELD_PRESSURE
            }
        );
    }

    #[test]
    fn test_non_finite_field_is_data_error() {
        let data: SensorData = [
            ("temperature".to_string(), f64::NAN),
            ("humidity".to_string(), 1.0),
            ("pressure".to_string(), 1.0),
            ("battery".to_string(), 1.0),
        ]
        .into_iter()
        .collect();
        let err = normalize_sensor_data(&kitchen(), "AA:BB", &data, ZeroPolicy::Suppress).unwrap_err();
        assert!(matches!(err, DataError::NonFinite { field: FIELD_TEMPERATURE, .. }));
    }
}
