//! Unified error types for objgate.
//!
//! Every dispatch failure is classified into one of four [`ErrorKind`]s. The
//! three client-fault kinds terminate a dispatch with a structured payload;
//! [`ErrorKind::Unhandled`] is a server fault whose detail is kept for logging
//! and never echoed to the caller.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Machine-checkable classification of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No attribute path was supplied.
    MissingAttribute,
    /// The attribute path is not permitted, or does not exist.
    ForbiddenAttribute,
    /// An argument could not be coerced or was malformed.
    BadRequest,
    /// The leaf target (or the output transform) failed.
    Unhandled,
}

impl ErrorKind {
    /// HTTP-style status classification of this kind.
    pub fn status(self) -> u16 {
        match self {
            Self::MissingAttribute | Self::BadRequest => 400,
            Self::ForbiddenAttribute => 403,
            Self::Unhandled => 500,
        }
    }

    /// Returns `true` for kinds caused by the caller.
    pub fn is_client_fault(self) -> bool {
        !matches!(self, Self::Unhandled)
    }

    /// Returns the kind as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingAttribute => "missing_attribute",
            Self::ForbiddenAttribute => "forbidden_attribute",
            Self::BadRequest => "bad_request",
            Self::Unhandled => "unhandled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors raised by a value transform (input coercion or output conversion).
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// The value has a shape the transform cannot handle.
    #[error("expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected value kind.
        expected: &'static str,
        /// Actual value kind.
        got: &'static str,
    },

    /// A string could not be parsed into the target type.
    #[error("cannot parse {value:?} as {target}")]
    Parse {
        /// The offending input.
        value: String,
        /// Name of the target type.
        target: &'static str,
    },

    /// Custom transform error.
    #[error("{0}")]
    Custom(String),
}

impl TransformError {
    /// Creates a custom transform error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a parse error.
    pub fn parse(value: impl Into<String>, target: &'static str) -> Self {
        Self::Parse {
            value: value.into(),
            target,
        }
    }
}

// =============================================================================
// Call Errors
// =============================================================================

/// Errors raised while constructing a root object or invoking a leaf target.
#[derive(Debug, Error)]
pub enum CallError {
    /// A required argument was not supplied.
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    /// An argument was supplied but could not be used.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Why the argument was rejected.
        reason: String,
    },

    /// The target does not take an argument of this name.
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    /// The target body itself failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl CallError {
    /// Creates an invalid argument error.
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a message as a target failure.
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        Self::Failed(anyhow::anyhow!("{msg}"))
    }

    /// Returns `true` if the error was caused by the caller's arguments.
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

// =============================================================================
// Pattern and Request Errors
// =============================================================================

/// Errors raised while compiling attribute permission patterns.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// The pattern is not a valid regular expression.
    #[error("invalid attribute pattern '{pattern}': {reason}")]
    Invalid {
        /// The normalized pattern that failed to compile.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

/// Errors raised while building a [`Request`](crate::Request).
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// A structured body that is not a JSON object.
    #[error("request body must be a JSON object, got {0}")]
    BodyNotObject(&'static str),

    /// A query string that could not be decoded.
    #[error("malformed query string: {0}")]
    Query(String),
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// A classified dispatch failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No attribute path was supplied.
    #[error("No attribute (method or property) was specified.")]
    MissingAttribute,

    /// The attribute path is not permitted or cannot be resolved.
    #[error("Forbidden attribute: {attr}")]
    ForbiddenAttribute {
        /// The requested attribute path.
        attr: String,
    },

    /// Argument coercion failed or an argument was malformed.
    #[error("{message}")]
    BadRequest {
        /// Human-readable reason.
        message: String,
        /// The offending argument, when known.
        argument: Option<String>,
    },

    /// The leaf target failed. The source is for logging only.
    #[error("Failed to perform action on '{attr}'")]
    Unhandled {
        /// The attribute path being dispatched.
        attr: String,
        /// The original failure.
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// Creates a forbidden attribute error.
    pub fn forbidden(attr: impl Into<String>) -> Self {
        Self::ForbiddenAttribute { attr: attr.into() }
    }

    /// Creates a bad request error without an argument name.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            argument: None,
        }
    }

    /// Creates a bad request error blaming a specific argument.
    pub fn bad_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            argument: Some(argument.into()),
        }
    }

    /// Creates an unhandled error for `attr`.
    pub fn unhandled(attr: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Unhandled {
            attr: attr.into(),
            source: source.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAttribute => ErrorKind::MissingAttribute,
            Self::ForbiddenAttribute { .. } => ErrorKind::ForbiddenAttribute,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Unhandled { .. } => ErrorKind::Unhandled,
        }
    }

    /// Returns the status classification of this error.
    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    /// Builds the structured payload handed to the transport.
    pub fn payload(&self) -> ErrorPayload {
        let mut extra = Map::new();
        match self {
            Self::ForbiddenAttribute { attr } | Self::Unhandled { attr, .. } => {
                extra.insert("attribute".into(), Value::String(attr.clone()));
            }
            Self::BadRequest {
                argument: Some(argument),
                ..
            } => {
                extra.insert("argument".into(), Value::String(argument.clone()));
            }
            _ => {}
        }

        ErrorPayload {
            kind: self.kind(),
            status: self.status(),
            message: self.to_string(),
            extra,
        }
    }
}

impl From<RequestError> for DispatchError {
    fn from(err: RequestError) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Serializable error payload: kind, status and message are always present.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Error classification.
    pub kind: ErrorKind,
    /// Status classification.
    pub status: u16,
    /// Human-readable message.
    pub message: String,
    /// Optional additive fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorPayload {
    /// Converts the payload into a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.message.clone()))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for transforms.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for calls.
pub type CallResult<T> = Result<T, CallError>;
