//! # Poll/Push Scheduler
//!
//! Two mutually exclusive ways of moving readings from the sensor source to
//! the sink, selected once at startup through [`RunMode`]:
//!
//! - **Polling**: one dedicated task fetches a snapshot of every registered
//!   device, publishes it, then sleeps. The sleep and the fetch are both
//!   raced against the shutdown broadcast, so a termination request never
//!   waits for a full interval. With `once` set, the task exits after the
//!   first cycle and the scrape listener keeps serving the last values.
//! - **Push**: a handler is registered with the source and runs once per
//!   advertisement, on whatever task the source dispatches from. No timer is
//!   owned here.
//!
//! Fetch and data errors are logged at the iteration or device boundary and
//! never stop the scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::engine::context::ExporterContext;
use crate::error::SourceError;
use crate::ingestors::{EventSource, ReadingHandler, SensorData, SnapshotSource};

/// Default delay between polling cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack on top of the fetch timeout before the scheduler gives up on a
/// source that ignores its own deadline.
const FETCH_GRACE: Duration = Duration::from_secs(1);

/// Polling mode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    /// Run exactly one fetch-normalize-publish cycle, then stop polling.
    pub once: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            once: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Polling(PollSettings),
    Push,
}

/// What [`Scheduler::start`] left running.
#[derive(Debug)]
pub enum SchedulerHandle {
    /// The polling task.
    Polling(JoinHandle<()>),
    /// The handler is owned by the source.
    Push,
}

/// Owns the exporter context and starts the configured run mode.
pub struct Scheduler {
    context: ExporterContext,
}

impl Scheduler {
    pub fn new(context: ExporterContext) -> Self {
        Self { context }
    }

    /// Starts the scheduler in the requested mode.
    pub fn start<S>(
        self,
        source: Arc<S>,
        mode: RunMode,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<SchedulerHandle, SourceError>
    where
        S: SnapshotSource + EventSource + 'static,
    {
        match mode {
            RunMode::Polling(settings) => {
                log::info!(
                    "Polling mode: every {}s, fetch timeout {}s{}",
                    settings.interval.as_secs(),
                    settings.fetch_timeout.as_secs(),
                    if settings.once { ", single shot" } else { "" }
                );
                Ok(SchedulerHandle::Polling(spawn_polling(self.context, source, settings, shutdown)))
            }
            RunMode::Push => {
                log::info!("Push mode: publishing advertisements as they arrive");
                subscribe_push(self.context, source.as_ref())?;
                Ok(SchedulerHandle::Push)
            }
        }
    }
}

/// Spawns the polling task.
pub fn spawn_polling<S>(
    context: ExporterContext,
    source: Arc<S>,
    settings: PollSettings,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()>
where
    S: SnapshotSource + ?Sized + 'static,
{
    tokio::spawn(run_polling(context, source, settings, shutdown))
}

async fn run_polling<S>(
    context: ExporterContext,
    source: Arc<S>,
    settings: PollSettings,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: SnapshotSource + ?Sized,
{
    log::info!("Update task started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Update task received shutdown during fetch.");
                return;
            }
            result = poll_once(&context, source.as_ref(), settings.fetch_timeout) => match result {
                Ok(published) => log::debug!("Poll cycle published {} values", published),
                Err(e) => log::error!("Poll cycle failed: {}", e),
            }
        }

        if settings.once {
            log::info!("Single-shot poll complete; update task exiting.");
            return;
        }

        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Update task received shutdown signal.");
                return;
            }
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}

/// One fetch-normalize-publish cycle over every registered device. Returns
/// the number of gauges updated.
pub async fn poll_once<S>(
    context: &ExporterContext,
    source: &S,
    fetch_timeout: Duration,
) -> Result<usize, SourceError>
where
    S: SnapshotSource + ?Sized,
{
    let device_ids = context.registry.device_ids();
    if device_ids.is_empty() {
        log::warn!("No beacons configured; nothing to fetch");
        return Ok(0);
    }

    log::debug!("Fetching data for {:?}", device_ids);
    let snapshot = tokio::time::timeout(
        fetch_timeout + FETCH_GRACE,
        source.fetch(&device_ids, fetch_timeout),
    )
    .await
    .map_err(|_| SourceError::Timeout(fetch_timeout))??;

    if snapshot.len() < device_ids.len() {
        log::info!(
            "{} of {} beacons reported this cycle",
            snapshot.len(),
            device_ids.len()
        );
    }

    Ok(context.process_snapshot(&snapshot))
}

/// Registers the push handler with the source.
pub fn subscribe_push<S>(context: ExporterContext, source: &S) -> Result<(), SourceError>
where
    S: EventSource + ?Sized,
{
    let handler: ReadingHandler = Arc::new(move |device_id: &str, data: &SensorData| {
        if let Err(e) = context.process_reading(device_id, data) {
            log::error!("Skipping advertisement: {}", e);
        }
    });
    source.subscribe(handler)
}
