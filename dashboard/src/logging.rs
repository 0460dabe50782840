//! FILENAME: dashboard/src/logging.rs
// PURPOSE: Unified, category-tagged logging for the dashboard.
// CONTEXT: Library crates log through the `log` facade with a category as
// the target ("TREND", "EXPORT", "FETCH", ...). This module installs the
// sink that writes those lines as `seq|LEVEL|CATEGORY|message` to stdout and,
// optionally, a log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use log::{LevelFilter, Log, Metadata, Record};

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::log_info;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter. Every written line takes the next value.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

static LOGGER: OnceLock<UnifiedLogger> = OnceLock::new();

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Formats one log line in the unified format.
pub fn format_line(seq: u64, level: log::Level, category: &str, message: &str) -> String {
    format!("{}|{}|{}|{}", seq, level, category, message)
}

pub struct UnifiedLogger {
    level: LevelFilter,
    file: Mutex<Option<File>>,
    echo: bool,
}

impl UnifiedLogger {
    pub fn new(level: LevelFilter, file: Option<File>, echo: bool) -> Self {
        UnifiedLogger {
            level,
            file: Mutex::new(file),
            echo,
        }
    }
}

impl Log for UnifiedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(next_seq(), record.level(), record.target(), &record.args().to_string());

        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                if let Err(e) = writeln!(file, "{}", line) {
                    eprintln!("[LOG_ERROR] Failed to write: {}", e);
                }
                let _ = file.flush();
            }
        }

        if self.echo {
            println!("{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

/// Installs the unified logger. With a `path`, the log file is created (or
/// truncated) and every line is also written there.
///
/// Can only succeed once per process.
pub fn init_logging(path: Option<&Path>, level: LevelFilter) -> Result<(), DashboardError> {
    let file = match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Some(
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?,
            )
        }
        None => None,
    };

    if LOGGER.get().is_some() {
        return Err(DashboardError::LoggerInstalled);
    }
    let logger = LOGGER.get_or_init(|| UnifiedLogger::new(level, file, true));
    log::set_logger(logger).map_err(|_| DashboardError::LoggerInstalled)?;
    log::set_max_level(level);
    Ok(())
}

/// Installs the unified logger at the configured level, writing to the
/// configured log file if there is one.
pub fn init_from_config(config: &DashboardConfig) -> Result<(), DashboardError> {
    let level = config.log_level_filter()?;
    init_logging(config.log_file.as_deref(), level)?;
    match &config.log_file {
        Some(path) => log_info!("CONFIG", "logging at {} to {}", level, path.display()),
        None => log_info!("CONFIG", "logging at {} to stdout", level),
    }
    Ok(())
}

// ============================================================================
// MACROS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::log::info!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::log::warn!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::log::error!(target: $cat, $($arg)*)
    };
}
