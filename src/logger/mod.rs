//! Structured logging for the channel layer
//!
//! Provides tagged, level-filtered console logging:
//!
//! ```rust
//! use fleetstream::logger::{self, LogTag};
//!
//! logger::info(LogTag::Channel, "Connected: alerts");
//! logger::warning(LogTag::Telemetry, "Dropping undecodable live reading");
//! ```
//!
//! Logging is fire-and-forget: callers never block on it and a failed write
//! is silently ignored. Initialize once at startup with [`init`]; without
//! initialization the default minimum level is Info.

mod levels;
mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

use chrono::Local;
use colored::Colorize;
use once_cell::sync::Lazy;
use std::sync::RwLock;

/// Runtime logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

static LOGGER: Lazy<RwLock<LoggerConfig>> = Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Set the minimum level shown on the console
pub fn init(min_level: LogLevel) {
    if let Ok(mut config) = LOGGER.write() {
        config.min_level = min_level;
    }
}

/// Check whether a message at `level` should be displayed
///
/// Errors are always shown; everything else is gated by the configured
/// minimum level.
pub fn should_log(level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }
    match LOGGER.read() {
        Ok(config) => level <= config.min_level,
        Err(_) => true,
    }
}

pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(level) {
        return;
    }

    let time = Local::now().format("%H:%M:%S").to_string();
    let level_str = match level {
        LogLevel::Error => level.as_str().red().bold().to_string(),
        LogLevel::Warning => level.as_str().yellow().to_string(),
        LogLevel::Info => level.as_str().green().to_string(),
        LogLevel::Debug => level.as_str().dimmed().to_string(),
    };

    println!(
        "{} [{:<9}] [{}] {}",
        time.dimmed(),
        tag.as_str().cyan(),
        level_str,
        message
    );
}
