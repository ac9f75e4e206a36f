use std::sync::Arc;
use std::time::Duration;

use lib_ruuvi::{LineSource, PollSettings, PrometheusSink, RecordingSink, RunMode, Scheduler, SchedulerHandle, ZeroPolicy};
use project_tests::{context, reading, ScriptedSource};
use tokio::io::BufReader;
use tokio::sync::broadcast;

const TWO_ROOMS: &str = r#"{"AA:BB": {"name": "kitchen"}, "CC:DD": {"name": "garage"}}"#;

fn script() -> ScriptedSource {
    ScriptedSource::new([
        ("AA:BB".to_string(), reading(21.5, 4530.0, 1013.0, 2950.0)),
        ("CC:DD".to_string(), reading(-4.25, 8800.0, 1001.5, 2800.0)),
        ("AA:BB".to_string(), reading(21.75, 4600.0, 1012.5, 2945.0)),
    ])
}

async fn run(mode: RunMode, sink: Arc<dyn lib_ruuvi::MetricSink>) {
    let (_tx, rx) = broadcast::channel(1);
    let scheduler = Scheduler::new(context(TWO_ROOMS, sink, ZeroPolicy::Suppress));
    match scheduler.start(Arc::new(script()), mode, rx).unwrap() {
        SchedulerHandle::Polling(handle) => handle.await.unwrap(),
        SchedulerHandle::Push => {}
    }
}

fn single_shot() -> RunMode {
    RunMode::Polling(PollSettings {
        interval: Duration::from_secs(30),
        fetch_timeout: Duration::from_secs(1),
        once: true,
    })
}

#[tokio::test]
async fn polling_and_push_reach_the_same_state() {
    let polled = Arc::new(RecordingSink::new());
    run(single_shot(), polled.clone()).await;

    let pushed = Arc::new(RecordingSink::new());
    run(RunMode::Push, pushed.clone()).await;

    assert_eq!(polled.snapshot().len(), 8);
    assert_eq!(polled.snapshot(), pushed.snapshot());
}

#[tokio::test]
async fn polling_and_push_render_identically() {
    let polled = Arc::new(PrometheusSink::new().unwrap());
    run(single_shot(), polled.clone()).await;

    let pushed = Arc::new(PrometheusSink::new().unwrap());
    run(RunMode::Push, pushed.clone()).await;

    assert_eq!(polled.render().unwrap(), pushed.render().unwrap());
    assert!(polled.render().unwrap().contains(r#"ruuvi_temperature_c{location="kitchen"} 21.75"#));
}

#[tokio::test]
async fn push_mode_starts_after_the_feed_has_ended() {
    let source = Arc::new(LineSource::from_reader(BufReader::new(&b"AA:BB 0512\n"[..])));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (_tx, rx) = broadcast::channel(1);
    let scheduler = Scheduler::new(context(TWO_ROOMS, Arc::new(RecordingSink::new()), ZeroPolicy::Suppress));
    assert!(matches!(
        scheduler.start(source, RunMode::Push, rx),
        Ok(SchedulerHandle::Push)
    ));
}
