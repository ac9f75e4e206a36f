//! # Line Source
//!
//! Reads advertisement lines (`<device_id> <hex manufacturer data>`) from an
//! async reader, decodes them, and fans the readings out on a broadcast
//! channel. The reader is either the process stdin or the stdout of an
//! external scanner command.
//!
//! The reader task owns the only strong `broadcast::Sender`. When the feed
//! ends the sender is dropped, so every pending fetch and push subscription
//! observes the closure.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::SourceError;
use crate::ingestors::decoder::parse_line;
use crate::ingestors::{EventSource, ReadingHandler, SensorData, Snapshot, SnapshotSource};

const CHANNEL_CAPACITY: usize = 256;

/// One decoded advertisement.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub device_id: String,
    pub data: SensorData,
}

/// Sensor source over a line-oriented advertisement feed.
pub struct LineSource {
    tx: broadcast::WeakSender<Arc<Advertisement>>,
}

impl LineSource {
    /// Starts reading `reader` on a background task. Must be called from
    /// within a tokio runtime.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self::start(reader, None)
    }

    /// Reads advertisement lines from the process stdin.
    pub fn stdin() -> Self {
        log::info!("Reading advertisements from stdin");
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    /// Runs `command` through `sh -c` and reads advertisement lines from its
    /// stdout. The child is killed when the feed task ends.
    pub fn spawn_scanner(command: &str) -> Result<Self, SourceError> {
        log::info!("Starting scanner: {}", command);
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SourceError::Io(std::io::Error::other("scanner stdout was not captured"))
        })?;

        Ok(Self::start(BufReader::new(stdout), Some(child)))
    }

    fn start<R>(reader: R, child: Option<Child>) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let weak = tx.downgrade();
        tokio::spawn(read_feed(reader, tx, child));
        Self { tx: weak }
    }

    fn receiver(&self) -> Result<broadcast::Receiver<Arc<Advertisement>>, SourceError> {
        self.tx
            .upgrade()
            .map(|tx| tx.subscribe())
            .ok_or(SourceError::Closed)
    }
}

async fn read_feed<R>(reader: R, tx: broadcast::Sender<Arc<Advertisement>>, child: Option<Child>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_line(&line) {
                Ok(Some((device_id, data))) => {
                    log::trace!("Advertisement from {}: {:?}", device_id, data);
                    // No receivers is fine: nobody is fetching right now.
                    let _ = tx.send(Arc::new(Advertisement { device_id, data }));
                }
                Ok(None) => {}
                Err(e) => log::debug!("Skipping advertisement line {:?}: {}", line, e),
            },
            Ok(None) => {
                log::warn!("Advertisement feed reached end of input");
                break;
            }
            Err(e) => {
                log::error!("Advertisement feed read error: {}", e);
                break;
            }
        }
    }

    if let Some(mut child) = child {
        match child.try_wait() {
            Ok(Some(status)) => log::warn!("Scanner exited with {}", status),
            Ok(None) => {
                let _ = child.kill().await;
                log::warn!("Scanner stopped producing output and was killed");
            }
            Err(e) => log::error!("Cannot query scanner status: {}", e),
        }
    }
}

#[async_trait]
impl SnapshotSource for LineSource {
    async fn fetch(&self, device_ids: &[String], timeout: Duration) -> Result<Snapshot, SourceError> {
        let mut snapshot = Snapshot::new();
        if device_ids.is_empty() {
            return Ok(snapshot);
        }

        let mut rx = self.receiver()?;
        let wanted: HashSet<&str> = device_ids.iter().map(String::as_str).collect();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    log::debug!("Fetch window closed with {}/{} devices", snapshot.len(), wanted.len());
                    break;
                }
                msg = rx.recv() => match msg {
                    Ok(adv) => {
                        if wanted.contains(adv.device_id.as_str()) {
                            snapshot.insert(adv.device_id.clone(), adv.data.clone());
                            if snapshot.len() == wanted.len() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Fetch lagged behind the feed by {} advertisements", skipped);
                    }
                    Err(RecvError::Closed) => {
                        if snapshot.is_empty() {
                            return Err(SourceError::Closed);
                        }
                        break;
                    }
                }
            }
        }

        Ok(snapshot)
    }
}

impl EventSource for LineSource {
    fn subscribe(&self, handler: ReadingHandler) -> Result<(), SourceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SourceError::Subscribe(e.to_string()))?;
        let mut rx = match self.receiver() {
            Ok(rx) => rx,
            Err(SourceError::Closed) => {
                log::warn!("Advertisement feed already closed; push subscription has nothing to deliver");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(adv) => {
                        let outcome = catch_unwind(AssertUnwindSafe(|| handler(&adv.device_id, &adv.data)));
                        if outcome.is_err() {
                            log::error!("Reading handler panicked for {}; continuing", adv.device_id);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Push handler lagged; {} advertisements dropped", skipped);
                    }
                    Err(RecvError::Closed) => {
                        log::warn!("Advertisement feed closed; push subscription ended");
                        break;
                    }
                }
            }
        });

        Ok(())
    }
}
