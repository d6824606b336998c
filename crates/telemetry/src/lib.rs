//! Logging setup for applications built on the Partner Sell SDK
//!
//! The SDK crates only emit `tracing` events. This crate installs the global
//! subscriber that turns them into output:
//! - `RUST_LOG`-style filtering with a configurable fallback level
//! - Compact human-readable or JSON lines
//! - A per-process session id for correlating logs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::TestWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Initialize logging with default configuration
pub fn init() -> anyhow::Result<()> {
    init_with_config(&TelemetryConfig::default())
}

/// Initialize logging with custom configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_with_config(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let writer = if config.test_writer {
        BoxMakeWriter::new(TestWriter::new())
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;

    tracing::info!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_file: bool,
    pub show_line_number: bool,
    /// Write through the test harness so output is captured per test
    pub test_writer: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            test_writer: false,
        }
    }
}

impl TelemetryConfig {
    /// Verbose output captured by the test harness
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            log_level: "debug".to_string(),
            show_target: true,
            test_writer: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id() {
        let id = session_id();
        assert!(!id.is_empty());
        // Should be a valid UUID
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(id, session_id());
    }

    #[test]
    fn test_config_from_toml() {
        let config: TelemetryConfig =
            toml::from_str("log_level = \"partnersell_client=debug\"\nformat = \"json\"\n").unwrap();
        assert_eq!(config.log_level, "partnersell_client=debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.show_target);
    }

    #[test]
    fn test_init_only_once() {
        assert!(init_with_config(&TelemetryConfig::for_tests()).is_ok());
        assert!(init().is_err());
    }
}
