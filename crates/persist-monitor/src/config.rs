//! Configuration for the monitor.
//!
//! Values come from an optional TOML file; command-line flags override
//! whatever the file sets. The event vocabulary is fixed and has no knob.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::report::ReportFormat;

/// Monitor configuration.
///
/// # Example
///
/// ```rust
/// use persist_monitor::{MonitorConfig, ReportFormat};
///
/// let config = MonitorConfig::new()
///     .with_report_format(ReportFormat::Json)
///     .with_log_filter("persist_monitor=debug");
/// assert_eq!(config.report_format, ReportFormat::Json);
/// assert!(config.input.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Replayed capture file to read instead of stdin.
    pub input: Option<PathBuf>,

    /// Rendering of the final statistics.
    pub report_format: ReportFormat,

    /// `tracing` filter directive for diagnostics on stderr.
    pub log_filter: String,
}

impl MonitorConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Input: stdin
    /// - Report format: text
    /// - Log filter: `warn`
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: None,
            report_format: ReportFormat::Text,
            log_filter: "warn".to_string(),
        }
    }

    /// Loads a config from a TOML file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&raw)
            .map_err(|e| MonitorError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses a config from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| MonitorError::Config(e.to_string()))
    }

    /// Sets the capture file to replay.
    #[must_use]
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Sets the report format.
    #[must_use]
    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}
