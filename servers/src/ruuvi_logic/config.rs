use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use lib_ruuvi::process::guard::DEFAULT_PID_FILE;
use lib_ruuvi::{
    ExporterSettings, FeedSource, PollSettings, RunMode, ZeroPolicy, DEFAULT_CONFIG_PATH, DEFAULT_PORT,
};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Exports Ruuvi beacon readings as Prometheus gauges", version)]
pub struct Config {
    #[clap(short = 'c', long = "config", env = "RUUVI_CONFIG", default_value = DEFAULT_CONFIG_PATH, help = "JSON file mapping beacon ids to location names.")]
    pub config_path: PathBuf,

    #[clap(short, long, env = "RUUVI_PORT", default_value_t = DEFAULT_PORT, help = "Port for the /metrics endpoint.")]
    pub port: u16,

    #[clap(long, env = "RUUVI_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), help = "Address for the /metrics endpoint.")]
    pub bind: IpAddr,

    #[clap(short, long, env = "RUUVI_VERBOSE", conflicts_with = "quiet", help = "Log at debug level.")]
    pub verbose: bool,

    #[clap(short, long, env = "RUUVI_QUIET", help = "Log warnings and errors only.")]
    pub quiet: bool,

    #[clap(long, env = "RUUVI_LOG_LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"], help = "Explicit log level; overrides --verbose/--quiet.")]
    pub log_level: Option<String>,

    #[clap(long, env = "RUUVI_LOG_DIR", help = "Also write logs to a timestamped file in this directory.")]
    pub log_dir: Option<PathBuf>,

    #[clap(short = 't', long = "thread", env = "RUUVI_THREAD", help = "Poll the sensors on a timer instead of publishing every advertisement.")]
    pub thread: bool,

    #[clap(short = 'd', long = "thread-delay", env = "RUUVI_THREAD_DELAY", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..), help = "Seconds between polls.")]
    pub thread_delay: u64,

    #[clap(long = "fetch-timeout", env = "RUUVI_FETCH_TIMEOUT", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..), help = "Seconds to wait for readings on each poll.")]
    pub fetch_timeout: u64,

    #[clap(short = 'o', long, env = "RUUVI_ONCE", help = "Poll once, then keep serving the last values.")]
    pub once: bool,

    #[clap(long = "keep-zero", env = "RUUVI_KEEP_ZERO", help = "Publish values that read exactly zero.")]
    pub keep_zero: bool,

    #[clap(long = "pid-file", env = "RUUVI_PID_FILE", default_value = DEFAULT_PID_FILE, help = "Lock file preventing a second instance.")]
    pub pid_file: PathBuf,

    #[clap(long, env = "RUUVI_SCANNER", help = "Command whose stdout supplies `<id> <hex>` advertisement lines. Defaults to stdin.")]
    pub scanner: Option<String>,
}

impl Config {
    pub fn log_level(&self) -> log::LevelFilter {
        if let Some(level) = self.log_level.as_deref().and_then(|l| log::LevelFilter::from_str(l).ok()) {
            return level;
        }
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }

    pub fn run_mode(&self) -> RunMode {
        if self.thread {
            RunMode::Polling(PollSettings {
                interval: Duration::from_secs(self.thread_delay),
                fetch_timeout: Duration::from_secs(self.fetch_timeout),
                once: self.once,
            })
        } else {
            RunMode::Push
        }
    }

    pub fn settings(&self) -> ExporterSettings {
        ExporterSettings {
            config_path: self.config_path.clone(),
            listen_addr: SocketAddr::new(self.bind, self.port),
            pid_file: self.pid_file.clone(),
            run_mode: self.run_mode(),
            zero_policy: if self.keep_zero { ZeroPolicy::Keep } else { ZeroPolicy::Suppress },
            feed: match &self.scanner {
                Some(command) => FeedSource::Scanner(command.clone()),
                None => FeedSource::Stdin,
            },
        }
    }
}

/// Loads `.env` if present, then parses CLI arguments with environment fallbacks.
pub fn load_config() -> Config {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {}", e);
        }
    }
    Config::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("ruuvi_exporter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]).settings();
        assert_eq!(settings, ExporterSettings::default());
    }

    #[test]
    fn test_polling_flags() {
        let config = parse(&["-t", "-d", "5", "--fetch-timeout", "3", "-o", "--keep-zero", "-p", "9000"]);
        let settings = config.settings();

        assert_eq!(
            settings.run_mode,
            RunMode::Polling(PollSettings {
                interval: Duration::from_secs(5),
                fetch_timeout: Duration::from_secs(3),
                once: true,
            })
        );
        assert_eq!(settings.zero_policy, ZeroPolicy::Keep);
        assert_eq!(settings.listen_addr.port(), 9000);
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&[]).log_level(), log::LevelFilter::Info);
        assert_eq!(parse(&["-v"]).log_level(), log::LevelFilter::Debug);
        assert_eq!(parse(&["-q"]).log_level(), log::LevelFilter::Warn);
        assert_eq!(parse(&["-q", "--log-level", "trace"]).log_level(), log::LevelFilter::Trace);
        assert!(Config::try_parse_from(["ruuvi_exporter", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_zero_delay_rejected() {
        assert!(Config::try_parse_from(["ruuvi_exporter", "-t", "-d", "0"]).is_err());
    }

    #[test]
    fn test_scanner_command() {
        let settings = parse(&["--scanner", "ruuvi-scan --raw"]).settings();
        assert_eq!(settings.feed, FeedSource::Scanner("ruuvi-scan --raw".to_string()));
    }
}
