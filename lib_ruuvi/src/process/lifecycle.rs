//! # Lifecycle Controller
//!
//! Waits for SIGINT or SIGTERM, then runs the shutdown sequence:
//!
//! 1. Log which signal arrived.
//! 2. Broadcast shutdown so the poller and the scrape listener stop.
//! 3. Run the registered hooks once, in registration order (lock release).
//! 4. Hand back exit code 0.

use std::fmt;

use tokio::signal;
use tokio::sync::broadcast;

pub type ShutdownHook = Box<dyn FnOnce() + Send>;

/// The termination request that ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "SIGINT"),
            Signal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

pub struct Lifecycle {
    shutdown_tx: broadcast::Sender<()>,
    hooks: Vec<(String, ShutdownHook)>,
    signals: SignalStreams,
}

impl Lifecycle {
    /// Creates the controller and installs the signal handlers right away,
    /// so a termination request during startup is queued rather than killing
    /// the process. Must be called within a tokio runtime.
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            hooks: Vec::new(),
            signals: SignalStreams::install(),
        }
    }

    /// A receiver that fires once shutdown begins.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Registers a hook to run during shutdown.
    pub fn on_shutdown(&mut self, name: impl Into<String>, hook: impl FnOnce() + Send + 'static) {
        self.hooks.push((name.into(), Box::new(hook)));
    }

    /// Blocks until a termination signal arrives, then shuts down.
    pub async fn wait_for_shutdown(mut self) -> i32 {
        let signal = self.signals.recv().await;
        self.shutdown(signal)
    }

    /// Runs the shutdown sequence for `signal`. Consumes the controller, so
    /// hooks can only ever run once.
    pub fn shutdown(self, signal: Signal) -> i32 {
        log::info!("{} received, initiating shutdown.", signal);

        // No receivers left is fine; everything may have finished already.
        let _ = self.shutdown_tx.send(());

        for (name, hook) in self.hooks {
            log::debug!("Running shutdown hook '{}'", name);
            hook();
        }

        log::info!("Shutdown complete.");
        0
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Registered signal listeners. A listener that could not be installed is
/// logged and that signal is simply never observed.
struct SignalStreams {
    #[cfg(unix)]
    interrupt: Option<signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<signal::unix::Signal>,
}

impl SignalStreams {
    #[cfg(unix)]
    fn install() -> Self {
        use signal::unix::SignalKind;

        let listen = |kind: SignalKind, name: &str| match signal::unix::signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::error!("Failed to install {} handler: {}", name, e);
                None
            }
        };
        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> Signal {
        async fn next(stream: &mut Option<signal::unix::Signal>) {
            match stream {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        }

        tokio::select! {
            _ = next(&mut self.interrupt) => Signal::Interrupt,
            _ = next(&mut self.terminate) => Signal::Terminate,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Signal {
        shutdown_signal().await
    }
}

/// # Shutdown Signal
///
/// Resolves on the next Ctrl+C (SIGINT) or, on Unix, SIGTERM. Handlers are
/// installed on the first poll; use [`Lifecycle::new`] to install them early.
pub async fn shutdown_signal() -> Signal {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => Signal::Interrupt,
        _ = terminate => Signal::Terminate,
    }
}
