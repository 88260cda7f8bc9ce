//! Configuration types for the logging system
//!
//! A simulation run is short, so logs go to the console (stderr) and,
//! optionally, to one JSONL file per run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::LoggingError;

/// Main logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level (can be overridden by RUST_LOG)
    pub default_level: String,

    /// Console output configuration
    pub console: ConsoleConfig,

    /// Run log file, if any
    pub run_log: Option<RunLogConfig>,

    /// JSONL output configuration
    pub jsonl: JsonlConfig,

    /// Filtering configuration
    pub filters: FilterConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            run_log: None,
            jsonl: JsonlConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}

impl LogConfig {
    /// Warnings only, as JSONL
    pub fn quiet() -> Self {
        Self {
            default_level: "warn".to_string(),
            ..Default::default()
        }
    }

    /// Debug level with human-readable console output
    pub fn verbose() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
            },
            ..Default::default()
        }
    }

    /// Also write every event as JSONL to `arbor-run.jsonl` in `directory`
    pub fn with_run_log(mut self, directory: impl Into<PathBuf>) -> Self {
        self.run_log = Some(RunLogConfig {
            directory: directory.into(),
            ..RunLogConfig::default()
        });
        self
    }

    /// Turn console output off
    pub fn without_console(mut self) -> Self {
        self.console.enabled = false;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, LoggingError> {
        serde_json::from_str(json).map_err(|e| LoggingError::Config(e.to_string()))
    }
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Enable console output
    pub enabled: bool,
    /// Use pretty (human-readable) format
    pub pretty: bool,
    /// Include ANSI colors
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false, // JSONL by default
            ansi: false,
        }
    }
}

/// Run log file configuration
///
/// The file is truncated when logging starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLogConfig {
    /// Directory for the log file, created if missing
    pub directory: PathBuf,
    /// File name inside `directory`
    pub file_name: String,
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            file_name: "arbor-run.jsonl".to_string(),
        }
    }
}

impl RunLogConfig {
    /// Full path of the log file
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// JSONL formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlConfig {
    /// Flatten event fields to root level
    pub flatten_events: bool,
    /// Include span list in events
    pub include_spans: bool,
    /// Include thread information
    pub include_thread_info: bool,
    /// Include file/line information
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_thread_info: false,
            include_location: true,
        }
    }
}

/// Filtering configuration
///
/// Applied on top of the default level, after RUST_LOG.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Targets to silence entirely
    pub exclude_targets: Vec<String>,
    /// Per-target levels, e.g. `"arbor_switch" => "trace"`
    pub targets: BTreeMap<String, String>,
}

impl FilterConfig {
    /// Render as `EnvFilter` directives
    pub fn directives(&self) -> Vec<String> {
        self.exclude_targets
            .iter()
            .map(|t| format!("{}=off", t))
            .chain(self.targets.iter().map(|(t, l)| format!("{}={}", t, l)))
            .collect()
    }
}
