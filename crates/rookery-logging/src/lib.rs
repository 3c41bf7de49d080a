//! Structured logging setup for the Rookery nest mesh
//!
//! Every crate in the workspace logs through `tracing`. This crate wires a
//! subscriber for binaries and tests: an `EnvFilter` (overridable through
//! `RUST_LOG`), a console layer (pretty or JSONL) and an optional JSONL file
//! layer written through `tracing-appender`.
//!
//! # Quick Start
//!
//! ```ignore
//! use rookery_logging::{LogConfig, RookerySubscriberBuilder};
//!
//! // JSONL to console
//! let _guard = RookerySubscriberBuilder::new().init()?;
//!
//! // Development mode with pretty human-readable output
//! let _guard = RookerySubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```
//!
//! Keep the returned [`LogGuard`] alive for as long as file output should
//! be flushed.

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Span names shared across the workspace
pub mod spans {
    /// A request being handled on its target nest
    pub const DISPATCH: &str = "dispatch";
    /// A request client call, across all of its attempts
    pub const REQUEST: &str = "request";
    /// A request being forwarded toward a non-neighbor
    pub const ROUTE: &str = "route";
    /// A scatter-gather storage lookup
    pub const LOOKUP: &str = "lookup";
}

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Keeps the non-blocking file writer alive
#[must_use = "dropping the guard stops file output"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Builder for configuring and initializing the logging subscriber
pub struct RookerySubscriberBuilder {
    config: LogConfig,
}

impl RookerySubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    ///
    /// Default: JSONL output to console
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

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// Fails if a global subscriber is already set or the log file cannot
    /// be opened.
    pub fn init(self) -> Result<LogGuard, LogError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<BoxedLayer<Registry>> = Vec::new();
        let mut file_guard = None;

        if self.config.console.enabled {
            if self.config.console.pretty {
                layers.push(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(self.config.console.ansi)
                        .with_target(true)
                        .boxed(),
                );
            } else {
                layers.push(jsonl_layer(&self.config.jsonl, std::io::stdout));
            }
        }

        if let Some(file_config) = &self.config.file {
            let (writer, guard) = file_writer(file_config)?;
            file_guard = Some(guard);
            layers.push(jsonl_layer(&self.config.jsonl, writer));
        }

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LogError::Init(e.to_string()))?;

        Ok(LogGuard { _file: file_guard })
    }
}

impl Default for RookerySubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// JSONL formatting layer over any writer
fn jsonl_layer<S, W>(config: &JsonlConfig, writer: W) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer)
        .boxed()
}

/// Open the log file; truncates for `Never` rotation, appends otherwise
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    fs::create_dir_all(&config.directory)?;
    let writer = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            tracing_appender::non_blocking(File::create(path)?)
        }
        RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            &config.directory,
            &config.prefix,
        )),
        RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::HOURLY,
            &config.directory,
            &config.prefix,
        )),
    };
    Ok(writer)
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<LogGuard, LogError> {
    RookerySubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
}

/// Initialize logging for tests
///
/// Output goes through the test harness so it is captured per test. Safe to
/// call from every test; only the first call installs anything.
pub fn init_testing() {
    let config = LogConfig::testing();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(config.console.ansi)
        .with_test_writer()
        .try_init();
}
