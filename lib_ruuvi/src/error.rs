//! # Error Taxonomy
//!
//! One error type per concern. Startup errors (`ConfigError`, `GuardError`,
//! `SinkError`) abort the process before any background activity starts.
//! Steady-state errors (`SourceError`, `DataError`, `DecodeError`) are caught
//! at the narrowest boundary, logged, and never leave the scheduler.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the beacon mapping file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The mapping file is missing or could not be read.
    #[error("Cannot read beacon config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The mapping file is not a valid `{ "<id>": {"name": "..."} }` object.
    #[error("Malformed beacon config {path}: {source}")]
    Parse {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// The lock file already exists: either another instance is running or a
/// previous one died without cleaning up. The two cases are indistinguishable.
#[derive(Debug, Error)]
#[error("Lock file {path} already exists; another exporter may be running: {source}")]
pub struct AlreadyRunningError {
    /// Lock file path.
    pub path: PathBuf,
    /// The error returned by the exclusive create.
    #[source]
    pub source: io::Error,
}

impl AlreadyRunningError {
    /// The process exit code for this failure: the raw OS error number when
    /// the OS reported one, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        self.source.raw_os_error().unwrap_or(1)
    }
}

/// Errors from the process singleton guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Lock file already present.
    #[error(transparent)]
    AlreadyRunning(#[from] AlreadyRunningError),

    /// The lock file was created but the pid could not be written.
    #[error("Cannot write pid to {path}: {source}")]
    Write {
        /// Lock file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl GuardError {
    /// Exit code to use when startup aborts on this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GuardError::AlreadyRunning(e) => e.exit_code(),
            GuardError::Write { source, .. } => source.raw_os_error().unwrap_or(1),
        }
    }
}

/// Failures of the external sensor source. Recoverable.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The advertisement feed has ended; no further readings will arrive.
    #[error("Sensor feed closed")]
    Closed,

    /// A fetch did not complete within its deadline.
    #[error("Sensor fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The external scanner process could not be started or read.
    #[error("Scanner I/O error: {0}")]
    Io(#[from] io::Error),

    /// A push subscription could not be registered.
    #[error("Subscription failed: {0}")]
    Subscribe(String),
}

/// A reading for one device is malformed. Recoverable: that device is
/// skipped for this cycle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    /// A required field was absent from the payload.
    #[error("Reading for {device_id} is missing field '{field}'")]
    MissingField {
        /// Device the reading came from.
        device_id: String,
        /// The absent field name.
        field: &'static str,
    },

    /// A field carried NaN or an infinity.
    #[error("Reading for {device_id} has non-finite '{field}' ({value})")]
    NonFinite {
        /// Device the reading came from.
        device_id: String,
        /// Offending field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Errors decoding a raw advertisement line or payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line did not have the `<device_id> <hex>` shape.
    #[error("Malformed advertisement line")]
    MalformedLine,

    /// The payload was not valid hexadecimal.
    #[error("Invalid hex payload: {0}")]
    Hex(String),

    /// The payload was shorter than its data format requires.
    #[error("Payload too short for format {format}: {len} bytes")]
    TooShort {
        /// Data format byte.
        format: u8,
        /// Actual payload length.
        len: usize,
    },

    /// The data format byte is not one this decoder understands.
    #[error("Unsupported data format {0}")]
    UnsupportedFormat(u8),

    /// The payload was empty.
    #[error("Empty payload")]
    Empty,
}

/// Errors from the metrics exposition side.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The scrape listener could not bind its address (e.g. port in use).
    #[error("Cannot bind metrics listener on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: std::net::SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A gauge could not be created or registered.
    #[error("Metric registration failed: {0}")]
    Registration(#[from] prometheus::Error),

    /// The registry could not be encoded into the text exposition format.
    #[error("Metric encoding failed: {0}")]
    Encode(String),
}
