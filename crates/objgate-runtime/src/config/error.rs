//! Configuration error types.

use std::path::PathBuf;

use objgate_core::PatternError;
use objgate_framework::BuildError;
use thiserror::Error;

/// Errors that can occur during configuration loading, validation and assembly.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration could not be parsed or extracted.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// A transform spec names a coercion that is not registered.
    #[error("Unknown coercion: {0}")]
    UnknownCoercion(String),

    /// A permission or path pattern does not compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The dispatcher could not be assembled.
    #[error("Failed to build dispatcher: {0}")]
    Build(#[from] BuildError),
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
