use std::sync::Arc;

use lib_ruuvi::{MetricKind, PrometheusSink, RecordingSink, ZeroPolicy};
use project_tests::{context, reading, KITCHEN_CONFIG};

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("series should exist");
    assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
}

#[test]
fn kitchen_scenario_publishes_converted_gauges() {
    let sink = Arc::new(PrometheusSink::new().unwrap());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Suppress);

    let published = ctx.process_reading("AA:BB", &reading(21.5, 4530.0, 1013.0, 2950.0)).unwrap();
    assert_eq!(published, 4);

    assert_close(sink.value(MetricKind::Temperature, "kitchen"), 21.5);
    assert_close(sink.value(MetricKind::Humidity, "kitchen"), 45.3);
    assert_close(sink.value(MetricKind::Pressure, "kitchen"), 1013.0);
    assert_close(sink.value(MetricKind::Battery, "kitchen"), 2.95);

    let text = sink.render().unwrap();
    assert!(text.contains(r#"ruuvi_temperature_c{location="kitchen"} 21.5"#));
    assert!(text.contains(r#"ruuvi_battery_v{location="kitchen"} 2.95"#));
}

#[test]
fn zero_battery_creates_no_series() {
    let sink = Arc::new(PrometheusSink::new().unwrap());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Suppress);

    ctx.process_reading("AA:BB", &reading(21.5, 4530.0, 1013.0, 0.0)).unwrap();

    assert_eq!(sink.value(MetricKind::Battery, "kitchen"), None);
    assert!(!sink.render().unwrap().contains("ruuvi_battery_v{"));
    assert_close(sink.value(MetricKind::Temperature, "kitchen"), 21.5);
}

#[test]
fn zero_battery_leaves_previous_value() {
    let sink = Arc::new(RecordingSink::new());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Suppress);

    ctx.process_reading("AA:BB", &reading(21.5, 4530.0, 1013.0, 2950.0)).unwrap();
    ctx.process_reading("AA:BB", &reading(22.0, 4530.0, 1013.0, 0.0)).unwrap();

    assert_close(sink.get(MetricKind::Battery, "kitchen"), 2.95);
    assert_close(sink.get(MetricKind::Temperature, "kitchen"), 22.0);
}

#[test]
fn keep_zero_policy_publishes_zero() {
    let sink = Arc::new(RecordingSink::new());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Keep);

    ctx.process_reading("AA:BB", &reading(0.0, 4530.0, 1013.0, 0.0)).unwrap();

    assert_eq!(sink.get(MetricKind::Temperature, "kitchen"), Some(0.0));
    assert_eq!(sink.get(MetricKind::Battery, "kitchen"), Some(0.0));
}

#[test]
fn unknown_device_is_labelled_by_raw_id() {
    let sink = Arc::new(RecordingSink::new());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Suppress);

    ctx.process_reading("CC:DD", &reading(5.0, 1000.0, 990.0, 3000.0)).unwrap();

    assert_close(sink.get(MetricKind::Temperature, "CC:DD"), 5.0);
    assert_close(sink.get(MetricKind::Humidity, "CC:DD"), 10.0);
    assert_eq!(sink.get(MetricKind::Temperature, "kitchen"), None);
}

#[test]
fn republishing_does_not_accumulate() {
    let sink = Arc::new(PrometheusSink::new().unwrap());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Suppress);
    let data = reading(21.5, 4530.0, 1013.0, 2950.0);

    ctx.process_reading("AA:BB", &data).unwrap();
    let first = sink.render().unwrap();
    ctx.process_reading("AA:BB", &data).unwrap();

    assert_eq!(sink.render().unwrap(), first);
    assert_close(sink.value(MetricKind::Pressure, "kitchen"), 1013.0);
}

#[test]
fn malformed_reading_is_rejected_without_publishing() {
    let sink = Arc::new(RecordingSink::new());
    let ctx = context(KITCHEN_CONFIG, sink.clone(), ZeroPolicy::Suppress);

    let mut data = reading(21.5, 4530.0, 1013.0, 2950.0);
    data.remove("pressure");

    assert!(ctx.process_reading("AA:BB", &data).is_err());
    assert!(sink.snapshot().is_empty());
}
