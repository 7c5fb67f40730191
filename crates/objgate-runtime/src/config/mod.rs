//! Configuration for objgate.
//!
//! Settings are loaded with figment from defaults, TOML/YAML files and
//! `OBJGATE_*` environment variables, then validated before a dispatcher is
//! assembled from them.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, PROFILE_ENV, Profile};
pub use schema::{
    GateConfig, GateSettings, KindRule, LayerRules, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, SpanEventConfig, TransRule,
};
pub use validation::{validate_config, validate_gate_settings};
