//! Configuration for the channel layer
//!
//! All values have embedded defaults so the crate works without a config
//! file. `load_from_path` reads a TOML file when present and falls back to
//! defaults when it is absent; parse errors are surfaced, not swallowed.
//!
//! The configuration is an owned value handed to whatever composes the
//! system (there is no process-wide config singleton).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub realtime: RealtimeConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// WebSocket channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Base URL the channel path is appended to
    pub ws_base_url: String,
    /// Fixed delay before a dropped channel is re-established
    pub reconnect_delay_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://localhost:8000/api/v1/ws".to_string(),
            reconnect_delay_ms: 3000,
        }
    }
}

/// Historical telemetry query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Base URL of the REST API serving historical queries
    pub api_base_url: String,
    /// Request timeout for historical fetches
    pub timeout_seconds: u64,
    /// Per-tag reading cap when live points are appended to a series
    pub live_buffer_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            timeout_seconds: 10,
            live_buffer_capacity: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum console log level (error/warning/info/debug)
    pub min_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            min_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing file means defaults; a file that exists but does not parse is
    /// an error.
    pub fn load_from_path(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;

        toml::from_str::<Config>(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path))
    }
}
