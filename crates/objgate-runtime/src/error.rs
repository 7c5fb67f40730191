//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while assembling a gateway.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading, validation or compilation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No root object or constructor was supplied.
    #[error("No root object configured")]
    MissingRoot,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
