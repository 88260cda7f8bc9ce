//! Structured JSONL logging for Arbor
//!
//! Every switch in a simulation logs through the same process, so log
//! lines need to say which switch produced them. This crate sets up a
//! `tracing` subscriber whose spans carry the active switch and run.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Switch Context Injection**: Spans record which switch and run they belong to
//! - **Run Logs**: One JSONL file per run, written off-thread via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use arbor_logging::{ArborSubscriberBuilder, LogConfig};
//!
//! // Simple setup with defaults (JSONL to console)
//! ArborSubscriberBuilder::new().init();
//!
//! // Pretty console output plus a JSONL file of the run
//! let _guard = ArborSubscriberBuilder::new()
//!     .with_config(LogConfig::verbose().with_run_log("./logs"))
//!     .init();
//! ```
//!
//! # Switch Context
//!
//! Drivers wrap message handling in [`with_switch_context!`]:
//!
//! ```ignore
//! arbor_logging::with_switch_context!(switch_id, run_id, {
//!     switch.process_message(msg, &mut queue);
//! });
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FilterConfig, JsonlConfig, LogConfig, RunLogConfig};
pub use context::{SwitchContextData, SwitchContextGuard};
pub use layers::SwitchContextLayer;
pub use tracing;
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while setting up logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid logging configuration: {0}")]
    Config(String),

    #[error("Invalid filter directive {directive:?}: {reason}")]
    Directive { directive: String, reason: String },

    #[error("Failed to create log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global subscriber is already set: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Builder for configuring and initializing the Arbor logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::verbose()`
/// for human-readable pretty output.
pub struct ArborSubscriberBuilder {
    config: LogConfig,
}

impl ArborSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Write a JSONL log of the run
    pub fn with_run_log(mut self, config: RunLogConfig) -> Self {
        self.config.run_log = Some(config);
        self
    }

    /// Initialize the subscriber globally
    ///
    /// Returns a guard that must be kept alive while file output is in use.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber has already been set or the log file
    /// cannot be created.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => panic!("Failed to initialize logging: {}", e),
        }
    }

    /// Try to initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = self.env_filter()?;
        let console = &self.config.console;

        let pretty_layer = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(console.ansi)
                .with_target(true)
        });
        // Console logs go to stderr; stdout carries the switch log lines
        let jsonl_console_layer = (console.enabled && !console.pretty)
            .then(|| layers::jsonl_layer(std::io::stderr, &self.config.jsonl));

        let (file_layer, guard) = match &self.config.run_log {
            Some(run_log) => {
                let (writer, guard) = run_log_writer(run_log)?;
                (
                    Some(layers::jsonl_layer(writer, &self.config.jsonl)),
                    Some(guard),
                )
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(SwitchContextLayer::new())
            .with(pretty_layer)
            .with(jsonl_console_layer)
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }

    /// RUST_LOG if set, otherwise the configured level, plus filter directives
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        for directive in self.config.filters.directives() {
            let parsed = directive.parse().map_err(|e: tracing_subscriber::filter::ParseError| {
                LoggingError::Directive {
                    directive: directive.clone(),
                    reason: e.to_string(),
                }
            })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

impl Default for ArborSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the non-blocking writer for the run log
fn run_log_writer(run_log: &RunLogConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let path = run_log.path();
    let log_file_error = |source| LoggingError::LogFile {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(&run_log.directory).map_err(log_file_error)?;
    let file = File::create(&path).map_err(log_file_error)?;
    Ok(tracing_appender::non_blocking(file))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    ArborSubscriberBuilder::new().init();
}

/// Initialize verbose, pretty console logging
pub fn init_verbose() {
    ArborSubscriberBuilder::new()
        .with_config(LogConfig::verbose())
        .init();
}

/// Initialize warnings-only logging; safe to call repeatedly, e.g. from tests
pub fn init_quiet() {
    let _ = ArborSubscriberBuilder::new()
        .with_config(LogConfig::quiet())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = ArborSubscriberBuilder::new();
        assert_eq!(builder.config.default_level, "info");
    }

    #[test]
    fn test_default_is_jsonl() {
        let builder = ArborSubscriberBuilder::new();
        assert!(!builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = ArborSubscriberBuilder::new().with_config(LogConfig::verbose());
        assert_eq!(builder.config.default_level, "debug");
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_level_and_console() {
        let builder = ArborSubscriberBuilder::new()
            .with_level("trace")
            .with_console(false);
        assert_eq!(builder.config.default_level, "trace");
        assert!(!builder.config.console.enabled);
    }

    #[test]
    fn test_bad_directive_is_rejected() {
        let mut config = LogConfig::quiet();
        config
            .filters
            .targets
            .insert("arbor_switch".to_string(), "loud".to_string());
        let builder = ArborSubscriberBuilder::new().with_config(config);
        assert!(matches!(
            builder.env_filter(),
            Err(LoggingError::Directive { .. })
        ));
    }

    #[test]
    fn test_with_run_log() {
        let builder = ArborSubscriberBuilder::new().with_run_log(RunLogConfig::default());
        assert_eq!(
            builder.config.run_log.map(|r| r.path()),
            Some(PathBuf::from("./logs/arbor-run.jsonl"))
        );
    }

    #[test]
    fn test_init_quiet_is_repeatable() {
        init_quiet();
        init_quiet();
        tracing::warn!("still alive");
    }
}
