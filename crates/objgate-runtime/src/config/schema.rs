//! Configuration schema definitions.
//!
//! A complete configuration file looks like this:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [gate]
//! permissions = ["greet", "fcalc.compute", "icalc.compute"]
//! constructor_args = ["user", "dflt_greeting"]
//! cache_size = 20
//!
//! [gate.input.argname]
//! x = "float"
//! y = "float"
//!
//! [gate.input.attr."icalc.compute".argname]
//! x = "int"
//!
//! [gate.output]
//! mode = { csv = "csv" }
//! else = "envelope"
//! ```
//!
//! Transform specs refer to coercions by name; see
//! [`CoercionRegistry`](crate::CoercionRegistry).

use std::collections::HashMap;
use std::path::PathBuf;

use objgate_core::{AttributeSpec, DEFAULT_SOURCES, ValueKind};
use objgate_framework::{DEFAULT_CACHE_SIZE, ReservedNames};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch settings.
    #[serde(default)]
    pub gate: GateSettings,
}

// =============================================================================
// Logging
// =============================================================================

/// Log level names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level.
    pub level: LogLevel,
    /// Line format.
    pub format: LogFormat,
    /// Destination.
    pub output: LogOutput,
    /// Span events.
    pub span_events: SpanEventConfig,
    /// Include thread ids.
    pub thread_ids: bool,
    /// Include file names and line numbers.
    pub file_location: bool,
    /// Log file for `output = "file"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Roll-over period of the log file.
    pub rotation: LogRotation,
    /// Rotated files kept on disk; older ones are deleted.
    pub max_files: u32,
    /// Per-module levels, e.g. `objgate_framework = "trace"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// Permitted attribute paths.
    pub permissions: AttributeSpec,
    /// Source collection order; later sources override earlier ones.
    pub sources: Vec<String>,
    /// Arguments redirected to root construction.
    pub constructor_args: Vec<String>,
    /// Constructor cache capacity; zero disables caching.
    pub cache_size: usize,
    /// Reserved argument names.
    pub reserved: ReservedNames,
    /// Read the attribute from capture group 1 of this pattern over the
    /// request path instead of from an argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr_from_path: Option<String>,
    /// Input coercion spec.
    pub input: TransRule,
    /// Output transform spec.
    pub output: TransRule,
    /// Default arguments per attribute.
    pub defaults: HashMap<String, Map<String, Value>>,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            permissions: AttributeSpec::default(),
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            constructor_args: Vec::new(),
            cache_size: DEFAULT_CACHE_SIZE,
            reserved: ReservedNames::default(),
            attr_from_path: None,
            input: TransRule::default(),
            output: TransRule::default(),
            defaults: HashMap::new(),
        }
    }
}

/// A transform spec in configuration form.
///
/// Either the name of a registered coercion, or conditional layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransRule {
    /// A registered coercion name.
    Named(String),
    /// Conditional layers.
    Layers(Box<LayerRules>),
}

impl Default for TransRule {
    fn default() -> Self {
        Self::Layers(Box::default())
    }
}

impl TransRule {
    /// Returns `true` if the rule has no entries.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Named(_) => false,
            Self::Layers(layers) => layers.is_empty(),
        }
    }
}

/// The conditional layers of a [`TransRule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRules {
    /// Branches on the request source, or on the output mode.
    #[serde(alias = "mode", skip_serializing_if = "HashMap::is_empty")]
    pub source: HashMap<String, TransRule>,
    /// Branches on the attribute path.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub attr: HashMap<String, TransRule>,
    /// Branches on the argument name.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub argname: HashMap<String, TransRule>,
    /// Branches on the value kind, tried in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valtype: Vec<KindRule>,
    /// Fallback branch.
    #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
    pub fallback: Option<TransRule>,
}

impl LayerRules {
    /// Returns `true` if no branch is configured.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
            && self.attr.is_empty()
            && self.argname.is_empty()
            && self.valtype.is_empty()
            && self.fallback.is_none()
    }
}

/// A value-kind branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindRule {
    /// The kind to match.
    pub kind: ValueKind,
    /// The rule applied to matching values.
    pub apply: TransRule,
}
