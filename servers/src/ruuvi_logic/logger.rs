use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const LOG_FILE_PREFIX: &str = "ruuvi_exporter_";

pub fn setup_logging(level: log::LevelFilter, log_dir: Option<&Path>) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(log_dir) = log_dir {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir)
                .with_context(|| format!("creating log directory {}", log_dir.display()))?;
        }

        // Only the file for this run survives.
        cleanup_old_logs(log_dir)?;

        let log_file_name = format!(
            "{}{}.log",
            LOG_FILE_PREFIX,
            chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        let log_path = log_dir.join(log_file_name);
        dispatch = dispatch.chain(
            fern::log_file(&log_path).with_context(|| format!("opening log file {}", log_path.display()))?,
        );
    }

    dispatch.apply()?;
    Ok(())
}

fn cleanup_old_logs(log_dir: &Path) -> Result<()> {
    let entries = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
        });

    for entry in entries {
        if let Err(e) = fs::remove_file(entry.path()) {
            eprintln!("Failed to delete old log file {:?}: {}", entry.path(), e);
        }
    }

    Ok(())
}
