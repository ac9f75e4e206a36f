//! # lib_ruuvi
//!
//! Ruuvi environmental beacon to Prometheus exporter core.
//!
//! Readings arrive from a sensor source (polled or pushed), are mapped from
//! hardware id to a human-readable location, converted into exposition units
//! and published as four gauges labelled by `location`:
//!
//! | Gauge | Unit |
//! |---|---|
//! | `ruuvi_temperature_c` | °C |
//! | `ruuvi_humidity_percent` | % |
//! | `ruuvi_pressure_hpa` | hPa |
//! | `ruuvi_battery_v` | V |
//!
//! ## Modules:
//! - **`engine`**: registry, normalizer, context and scheduler.
//! - **`ingestors`**: source traits, payload decoder, line-fed source.
//! - **`exposition`**: sink trait, Prometheus gauges, scrape listener.
//! - **`process`**: pid lock and signal-driven lifecycle.
//! - **`error`**: error types.

#![forbid(unsafe_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub mod engine;
pub mod error;
pub mod exposition;
pub mod ingestors;
pub mod process;

pub use crate::engine::context::ExporterContext;
pub use crate::engine::normalizer::{MetricKind, NormalizedMetric, ZeroPolicy};
pub use crate::engine::registry::{BeaconEntry, BeaconRegistry};
pub use crate::engine::scheduler::{PollSettings, RunMode, Scheduler, SchedulerHandle};
pub use crate::error::{ConfigError, DataError, DecodeError, GuardError, SinkError, SourceError};
pub use crate::exposition::{MetricSink, PrometheusSink, RecordingSink};
pub use crate::ingestors::{EventSource, LineSource, SensorData, Snapshot, SnapshotSource};
pub use crate::process::{Lifecycle, PidLock};

/// Default scrape port.
pub const DEFAULT_PORT: u16 = 9251;
/// Default beacon mapping file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Where advertisement lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Stdin,
    /// Shell command whose stdout is the feed.
    Scanner(String),
}

/// Fully resolved runtime settings. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterSettings {
    pub config_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub pid_file: PathBuf,
    pub run_mode: RunMode,
    pub zero_policy: ZeroPolicy,
    pub feed: FeedSource,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            pid_file: PathBuf::from(process::guard::DEFAULT_PID_FILE),
            run_mode: RunMode::Push,
            zero_policy: ZeroPolicy::default(),
            feed: FeedSource::Stdin,
        }
    }
}

impl FeedSource {
    /// Opens the feed.
    pub fn open(&self) -> Result<LineSource, SourceError> {
        match self {
            FeedSource::Stdin => Ok(LineSource::stdin()),
            FeedSource::Scanner(command) => LineSource::spawn_scanner(command),
        }
    }
}
