//! # Advertisement Decoder
//!
//! Decodes the manufacturer-specific data broadcast by the beacons into the
//! `{metric: value}` map the rest of the pipeline consumes. Two payload
//! layouts are understood, data format 3 (RAWv1) and data format 5 (RAWv2).
//!
//! Units produced match what the normalizer expects from the sensor source:
//! temperature in °C, humidity in centipercent, pressure in hPa and battery
//! in millivolts. Fields a beacon marks as "not available" come out as
//! `0.0`, which the zero suppression policy then drops.

use crate::error::DecodeError;
use crate::ingestors::SensorData;
use crate::engine::normalizer::{FIELD_BATTERY, FIELD_HUMIDITY, FIELD_PRESSURE, FIELD_TEMPERATURE};

/// Little-endian manufacturer id some scanners leave in front of the payload.
const MANUFACTURER_PREFIX: [u8; 2] = [0x99, 0x04];

const FORMAT_RAW_V1: u8 = 3;
const FORMAT_RAW_V2: u8 = 5;

const RAW_V1_LEN: usize = 14;
/// Format byte through the measurement sequence; the trailing MAC is optional.
const RAW_V2_MIN_LEN: usize = 18;

const PRESSURE_OFFSET_PA: f64 = 50_000.0;

/// Splits a scanner line of the form `<device_id> <hex payload>` and decodes
/// it. Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> Result<Option<(String, SensorData)>, DecodeError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let (Some(device_id), Some(payload), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DecodeError::MalformedLine);
    };

    let bytes = hex::decode(payload).map_err(|e| DecodeError::Hex(e.to_string()))?;
    let data = decode_payload(&bytes)?;
    Ok(Some((device_id.to_string(), data)))
}

/// Decodes a binary manufacturer data payload.
pub fn decode_payload(bytes: &[u8]) -> Result<SensorData, DecodeError> {
    let bytes = bytes.strip_prefix(&MANUFACTURER_PREFIX[..]).unwrap_or(bytes);
    let format = *bytes.first().ok_or(DecodeError::Empty)?;

    match format {
        FORMAT_RAW_V1 => decode_raw_v1(bytes),
        FORMAT_RAW_V2 => decode_raw_v2(bytes),
        other => Err(DecodeError::UnsupportedFormat(other)),
    }
}

fn be_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

fn sensor_data(temperature: f64, humidity: f64, pressure: f64, battery: f64) -> SensorData {
    [
        (FIELD_TEMPERATURE.to_string(), temperature),
        (FIELD_HUMIDITY.to_string(), humidity),
        (FIELD_PRESSURE.to_string(), pressure),
        (FIELD_BATTERY.to_string(), battery),
    ]
    .into_iter()
    .collect()
}

fn decode_raw_v1(bytes: &[u8]) -> Result<SensorData, DecodeError> {
    if bytes.len() < RAW_V1_LEN {
        return Err(DecodeError::TooShort {
            format: FORMAT_RAW_V1,
            len: bytes.len(),
        });
    }

    // 0.5 % steps
    let humidity = bytes[1] as f64 * 50.0;

    let magnitude = (bytes[2] & 0x7F) as f64 + bytes[3] as f64 / 100.0;
    let temperature = if bytes[2] & 0x80 != 0 { -magnitude } else { magnitude };

    let pressure = (be_u16(bytes, 4) as f64 + PRESSURE_OFFSET_PA) / 100.0;
    let battery = be_u16(bytes, 12) as f64;

    Ok(sensor_data(temperature, humidity, pressure, battery))
}

fn decode_raw_v2(bytes: &[u8]) -> Result<SensorData, DecodeError> {
    if bytes.len() < RAW_V2_MIN_LEN {
        return Err(DecodeError::TooShort {
            format: FORMAT_RAW_V2,
            len: bytes.len(),
        });
    }

    let raw_temperature = i16::from_be_bytes([bytes[1], bytes[2]]);
    let temperature = if raw_temperature == i16::MIN {
        0.0
    } else {
        raw_temperature as f64 * 0.005
    };

    // 0.0025 % steps, i.e. 0.25 centipercent
    let raw_humidity = be_u16(bytes, 3);
    let humidity = if raw_humidity == u16::MAX {
        0.0
    } else {
        raw_humidity as f64 * 0.25
    };

    let raw_pressure = be_u16(bytes, 5);
    let pressure = if raw_pressure == u16::MAX {
        0.0
    } else {
        (raw_pressure as f64 + PRESSURE_OFFSET_PA) / 100.0
    };

    // Upper 11 bits: battery above 1.6 V in mV. Lower 5 bits: tx power.
    let battery_bits = be_u16(bytes, 13) >> 5;
    let battery = if battery_bits == 0x7FF {
        0.0
    } else {
        battery_bits as f64 + 1600.0
    };

    Ok(sensor_data(temperature, humidity, pressure, battery))
}
