//! # Process Singleton Guard
//!
//! A pid lock file created with an exclusive create. Its existence is the
//! whole protocol: a second exporter pointed at the same path refuses to
//! start. A lock left behind by a crashed process is never broken
//! automatically; the operator removes it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AlreadyRunningError, GuardError};

/// Lock file used when none is configured.
pub const DEFAULT_PID_FILE: &str = "ruuvi-exporter.pid";

#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    released: AtomicBool,
}

impl PidLock {
    /// # Acquire
    ///
    /// Creates `path` exclusively and writes the current pid in decimal.
    ///
    /// # Errors
    ///
    /// - [`GuardError::AlreadyRunning`] when the exclusive create fails. The
    ///   wrapped error's `exit_code()` is the OS error number.
    /// - [`GuardError::Write`] when the pid cannot be written; the partial
    ///   file is removed again.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| AlreadyRunningError {
                path: path.clone(),
                source,
            })?;

        if let Err(source) = write_pid(&mut file) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(GuardError::Write { path, source });
        }

        log::info!("Acquired lock {} (pid {})", path.display(), std::process::id());
        Ok(Self {
            path,
            released: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Removes the lock file. Safe to call any number of times; only the first
    /// call touches the filesystem, and a file that is already gone is fine.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::info!("Released lock {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Lock {} was already removed", self.path.display())
            }
            Err(e) => log::error!("Failed to remove lock {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn write_pid(file: &mut File) -> io::Result<()> {
    write!(file, "{}", std::process::id())?;
    file.sync_all()
}
