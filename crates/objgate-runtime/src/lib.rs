//! objgate Runtime - configuration and assembly layer.
//!
//! This crate provides:
//! - Layered configuration with figment (`objgate.toml`, `OBJGATE_*` env vars)
//! - Validation of loaded settings
//! - The [`CoercionRegistry`] of named transforms referenced by configuration
//! - [`GateBuilder`], which turns settings into a [`Dispatcher`](objgate_framework::Dispatcher)
//! - [`Gateway`], a configured dispatcher mapping outcomes to status and body
//! - Logging setup over `tracing-subscriber`
//!
//! ```rust,ignore
//! use objgate_runtime::Gateway;
//!
//! let gateway = Gateway::builder()
//!     .root(Root::constructor(make_controller))
//!     .build()?;
//! ```

pub mod builder;
pub mod coercion;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use builder::GateBuilder;
pub use coercion::CoercionRegistry;
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, GateConfig, GateSettings, LoggingConfig, TransRule,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{Gateway, Response};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for applications built on objgate.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
