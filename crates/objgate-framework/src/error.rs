//! Error types for the objgate framework.

use thiserror::Error;

/// Errors raised while walking a dotted attribute path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A segment does not name a member of the object reached so far.
    #[error("'{segment}' is not a member of '{parent}'")]
    Missing {
        /// The missing segment.
        segment: String,
        /// The path resolved so far, or the root type name.
        parent: String,
    },

    /// A segment follows a method or plain value, which have no members.
    #[error("'{parent}' has no members (looking up '{segment}')")]
    NotTraversable {
        /// The segment that could not be looked up.
        segment: String,
        /// The path of the leaf member.
        parent: String,
    },
}

/// Errors raised while assembling a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// No root object or constructor was configured.
    #[error("a root object or constructor is required")]
    MissingRoot,

    /// A reserved argument name is also used for another purpose.
    #[error("argument name '{0}' is used more than once among reserved and constructor names")]
    NameCollision(String),

    /// No request sources were configured.
    #[error("at least one request source is required")]
    NoSources,
}

/// Result type for path resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;
