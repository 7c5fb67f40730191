//! Logging setup for objgate.
//!
//! Built on `tracing-subscriber`. Every dispatch runs inside a `dispatch`
//! span carrying the attribute path, so span events show the lifetime of
//! each call.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use objgate_runtime::{config::ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use objgate_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("objgate_framework=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{Level, warn};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

/// Default file name when `file_path` names a directory only.
const DEFAULT_LOG_FILE: &str = "objgate.log";

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    /// Span created.
    pub new: bool,
    /// Span entered.
    pub enter: bool,
    /// Span exited.
    pub exit: bool,
    /// Span closed.
    pub close: bool,
}

impl SpanEvents {
    /// No span events.
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close; one line at the start and end of each dispatch.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    /// All span events.
    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    /// Enter and exit only.
    pub const ACTIVE: Self = Self {
        new: false,
        enter: true,
        exit: true,
        close: false,
    };

    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.enter {
            span |= fmt::format::FmtSpan::ENTER;
        }
        if self.exit {
            span |= fmt::format::FmtSpan::EXIT;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

// =============================================================================
// Configuration-Based Initialization
// =============================================================================

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

// =============================================================================
// File Output
// =============================================================================

/// A rolling log file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileSink {
    path: PathBuf,
    rotation: LogRotation,
    max_files: usize,
}

impl FileSink {
    fn from_config(config: &LoggingConfig) -> Option<Self> {
        config.file_path.as_ref().map(|path| Self {
            path: path.clone(),
            rotation: config.rotation,
            max_files: config.max_files as usize,
        })
    }

    /// Opens the appender. Rotated files are named `<file name>.<date>`;
    /// only the newest `max_files` of them are kept.
    fn appender(&self) -> Result<RollingFileAppender, InitError> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self
            .path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(DEFAULT_LOG_FILE);
        let rotation = match self.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };

        RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(name)
            .max_log_files(self.max_files)
            .build(dir)
    }
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// A builder for configuring logging.
///
/// ```rust,ignore
/// LoggingBuilder::new()
///     .with_level(Level::DEBUG)
///     .span_events(SpanEvents::LIFECYCLE)
///     .init();
/// ```
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<Level>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    file_location: bool,
    file: Option<FileSink>,
}

impl LoggingBuilder {
    /// Creates a builder writing compact lines to stdout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            directives: filters
                .into_iter()
                .map(|(module, level)| format!("{module}={level}"))
                .collect(),
            level: Some(config.level.to_tracing_level()),
            span_events: SpanEvents::from(&config.span_events),
            format: config.format,
            output: config.output,
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            file: FileSink::from_config(config),
        }
    }

    /// Sets the global log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive, e.g. `objgate_core=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Configures span events.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    /// Initializes the logging system.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Tries to initialize the logging system.
    ///
    /// Problems found while setting up are logged once the subscriber is
    /// installed.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let mut notices = Vec::new();
        let filter = self.build_filter(&mut notices);
        let writer = self.writer(&mut notices);

        #[cfg(not(feature = "json-log"))]
        if self.format == LogFormat::Json {
            notices.push("JSON log format requires the json-log feature, using full format".into());
        }

        let result = tracing_subscriber::registry()
            .with(self.layer(writer))
            .with(filter)
            .try_init();

        for notice in notices {
            warn!("{notice}");
        }
        result
    }

    /// `RUST_LOG` takes precedence over the configured level.
    fn build_filter(&self, notices: &mut Vec<String>) -> EnvFilter {
        let base_level = self.level.unwrap_or(Level::INFO);
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(base_level.as_str().to_lowercase()));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => notices.push(format!("Ignoring invalid log directive {directive}: {e}")),
            }
        }
        filter
    }

    fn writer(&self, notices: &mut Vec<String>) -> BoxMakeWriter {
        match (self.output, &self.file) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(sink)) => match sink.appender() {
                Ok(appender) => BoxMakeWriter::new(appender),
                Err(e) => {
                    notices.push(format!(
                        "Cannot open log file {}: {e}, using stderr",
                        sink.path.display()
                    ));
                    BoxMakeWriter::new(std::io::stderr)
                }
            },
            (LogOutput::File, None) => {
                notices.push("File output requested but no file path configured, using stdout".into());
                BoxMakeWriter::new(std::io::stdout)
            }
        }
    }

    fn layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer::<Registry>()
            .with_writer(writer)
            .with_span_events(self.span_events.to_fmt_span())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_event_flags() {
        let config = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(SpanEvents::from(&config), SpanEvents::LIFECYCLE);
        assert_eq!(SpanEvents::default(), SpanEvents::NONE);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            thread_ids: true,
            file_location: true,
            ..Default::default()
        };
        config
            .filters
            .insert("objgate_framework".into(), LogLevel::Trace);
        config.filters.insert("objgate_core".into(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Some(Level::DEBUG));
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.thread_ids && builder.file_location);
        assert_eq!(builder.file, None);
        assert_eq!(
            builder.directives,
            ["objgate_core=warn", "objgate_framework=trace"]
        );
    }

    #[test]
    fn test_file_sink_from_config() {
        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some("logs/gate.log".into()),
            rotation: LogRotation::Hourly,
            max_files: 3,
            ..Default::default()
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(
            builder.file,
            Some(FileSink {
                path: "logs/gate.log".into(),
                rotation: LogRotation::Hourly,
                max_files: 3,
            })
        );
    }

    #[test]
    fn test_file_sink_writes_rotated_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink {
            path: dir.path().join("gate.log"),
            rotation: LogRotation::Daily,
            max_files: 2,
        };
        let mut appender = sink.appender().unwrap();
        writeln!(appender, "dispatched").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("gate.log."), "{names:?}");
    }
}
