//! Log output configuration
//!
//! Where logs go and how many old log files are kept. Applied once at startup
//! by [`crate::logging_setup::init`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;

const LOG_FILE_PREFIX: &str = "pulsemap_";
const LOG_FILE_EXTENSION: &str = "log";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
    /// Directory holding log files
    pub log_dir: PathBuf,
    /// Number of log files kept after cleanup, including the new one
    pub max_files: usize,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a timestamped file in `log_dir`
    pub file_output: bool,
    /// Session timestamp used in the file name
    #[serde(skip)]
    session: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            max_files: 10,
            console_output: true,
            file_output: true,
            session: chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
        }
    }
}

impl LogConfig {
    /// Parsed level, INFO if the string is not a level name
    pub fn parse_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }

    /// Create the log directory if needed
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Path of this session's log file
    pub fn current_log_path(&self) -> PathBuf {
        self.log_dir.join(format!(
            "{}{}.{}",
            LOG_FILE_PREFIX, self.session, LOG_FILE_EXTENSION
        ))
    }

    /// Delete the oldest log files so that at most `max_files - 1` remain
    /// before this session's file is created. Returns the number removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.file_output || !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_log_file(path))
            .collect();

        let keep = self.max_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        // Timestamped names sort chronologically
        logs.sort();
        let excess = logs.len() - keep;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

fn is_log_file(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
    named && path.extension().is_some_and(|ext| ext == LOG_FILE_EXTENSION)
}
