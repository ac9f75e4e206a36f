use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lib_ruuvi::exposition::http::{self, MetricsServer};
use lib_ruuvi::{BeaconRegistry, ExporterContext, ExporterSettings, Lifecycle, PidLock, PrometheusSink, Scheduler};

mod ruuvi_logic;
use ruuvi_logic::{config, logger};

/// Upper bound on waiting for in-flight scrapes after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let config = config::load_config();
    if let Err(e) = logger::setup_logging(config.log_level(), config.log_dir.as_deref()) {
        eprintln!("Failed to set up logging: {:#}", e);
        std::process::exit(1);
    }

    let code = run(config.settings()).await;
    log::logger().flush();

    // The feed reader may be parked on a blocking stdin read; do not wait for it.
    std::process::exit(code);
}

async fn run(settings: ExporterSettings) -> i32 {
    // --- Phase 1: Singleton guard ---
    let lock = match PidLock::acquire(&settings.pid_file) {
        Ok(lock) => Arc::new(lock),
        Err(e) => {
            log::error!("{}", e);
            return e.exit_code();
        }
    };

    // Signals arriving from here on are queued until Phase 3.
    let mut lifecycle = Lifecycle::new();

    // --- Phase 2: Start components ---
    let server = match start(&settings, &mut lifecycle, lock.clone()).await {
        Ok(server) => server,
        Err(e) => {
            log::error!("Startup failed: {:#}", e);
            lock.release();
            return 1;
        }
    };

    // --- Phase 3: Run until signalled ---
    let code = lifecycle.wait_for_shutdown().await;

    if tokio::time::timeout(DRAIN_TIMEOUT, server.handle).await.is_err() {
        log::warn!("Metrics listener did not stop within {}s", DRAIN_TIMEOUT.as_secs());
    }
    code
}

async fn start(settings: &ExporterSettings, lifecycle: &mut Lifecycle, lock: Arc<PidLock>) -> Result<MetricsServer> {
    let registry = BeaconRegistry::load(&settings.config_path)?;
    log::info!(
        "Loaded {} beacons from {}",
        registry.len(),
        settings.config_path.display()
    );

    let sink = Arc::new(PrometheusSink::new()?);
    let server = http::start(sink.clone(), settings.listen_addr, lifecycle.subscribe()).await?;

    let source = Arc::new(settings.feed.open().context("opening advertisement feed")?);

    let context = ExporterContext::new(Arc::new(registry), sink, settings.zero_policy);
    Scheduler::new(context)
        .start(source, settings.run_mode, lifecycle.subscribe())
        .context("starting scheduler")?;

    lifecycle.on_shutdown("release pid lock", move || lock.release());

    Ok(server)
}
