//! # objgate Core
//!
//! Core types of the objgate dispatch adapter.
//!
//! objgate exposes an object graph as request-handling endpoints: a request
//! names a dotted attribute path, the path is checked against a permission
//! policy, request arguments are coerced, the leaf target is invoked, and its
//! result is converted into a payload. This crate holds the pieces that do not
//! depend on how objects are exposed:
//!
//! - **Values**: arguments and results are [`serde_json::Value`]s, tagged by
//!   [`ValueKind`] for type-driven branching.
//! - **Transform Specs**: layered conditional specifications ([`TransSpec`])
//!   resolving to a [`Transform`] under given [`Conditions`].
//! - **Permissions**: [`AttributeSpec`] compiled into an [`AttributeMatcher`].
//! - **Requests**: the [`Request`] model and [`AttrLocator`].
//! - **Errors**: the dispatch error taxonomy ([`DispatchError`], [`ErrorKind`]).
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌───────────┐   ┌────────┐   ┌────────┐
//! │ Request │──▶│ Permission │──▶│   Input   │──▶│ Target │──▶│ Output │
//! │  (attr) │   │  (matcher) │   │ (coerce)  │   │ (call) │   │(trans) │
//! └─────────┘   └────────────┘   └───────────┘   └────────┘   └────────┘
//! ```
//!
//! The dispatcher itself lives in `objgate-framework`.

pub mod error;
pub mod permission;
pub mod request;
pub mod trans;
pub mod value;

pub use error::{
    CallError, CallResult, DispatchError, DispatchResult, ErrorKind, ErrorPayload, PatternError,
    RequestError, TransformError, TransformResult,
};
pub use permission::{AttributeMatcher, AttributeSpec, PatternCache, PermitFn};
pub use request::{AttrLocator, BODY, DEFAULT_SOURCES, QUERY, ROUTE, Request, Source};
pub use trans::{Conditions, Layers, TransSpec, Transform, TransformFn};
pub use value::{ValueKind, kind_name};

pub use serde_json::{Map, Value};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::*;
    pub use super::permission::{AttributeMatcher, AttributeSpec};
    pub use super::request::{AttrLocator, Request};
    pub use super::trans::{Conditions, Layers, TransSpec, Transform};
    pub use super::value::ValueKind;
    pub use serde_json::{Value, json};
}
