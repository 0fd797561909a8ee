//! Command-line argument parsing.

use crate::logging::LogConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "pulsemap")]
#[command(about = "Headless audio-reactive parameter engine", long_about = None)]
pub struct Args {
    /// Engine configuration (TOML, or JSON by .json extension).
    /// Uses the built-in demo setup when omitted
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run time in seconds; 0 runs until interrupted
    #[arg(long, value_name = "SECONDS", default_value = "10")]
    pub seconds: f32,

    /// Interval between frame reports
    #[arg(long, value_name = "MS", default_value = "500")]
    pub report_ms: u64,

    /// Default log level (RUST_LOG overrides)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Directory for log files
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Only log to stderr
    #[arg(long)]
    pub no_log_file: bool,

    /// Tempo of the synthetic audio
    #[arg(long, value_name = "BPM", default_value = "120")]
    pub bpm: f32,
}

impl Args {
    /// Logging settings from the flags
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::default();
        config.level = self.log_level.clone();
        config.log_dir = self.log_dir.clone();
        config.file_output = !self.no_log_file;
        config
    }

    /// Total run time, `None` for unbounded
    pub fn run_time(&self) -> Option<Duration> {
        if self.seconds > 0.0 {
            Duration::try_from_secs_f32(self.seconds).ok()
        } else {
            None
        }
    }

    /// Interval between frame reports
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_ms.max(1))
    }
}
