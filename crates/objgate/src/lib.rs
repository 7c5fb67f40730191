//! # objgate
//!
//! Expose an object graph to untrusted callers as a permissioned,
//! argument-coercing call surface.
//!
//! ## Overview
//!
//! A request names an attribute path such as `fcalc.compute` and carries
//! arguments in one or more sources (body, query string, route). objgate
//! checks the path against a permission policy, collects and coerces the
//! arguments, builds (or reuses) the root object, walks the path, invokes the
//! target and converts the result into a payload.
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌───────────┐   ┌────────┐
//! │ Request  │──▶│ Permission │──▶│   Input   │──▶│   Root +  │──▶│ Output │──▶ payload
//! │ (sources)│   │  matcher   │   │ collector │   │ path walk │   │ trans  │
//! └──────────┘   └────────────┘   └───────────┘   └───────────┘   └────────┘
//! ```
//!
//! - **Core**: values, errors, transform specs, permissions, requests
//! - **Framework**: exposure model, constructor cache, dispatcher, tower service
//! - **Runtime**: configuration, coercion registry, logging, [`Gateway`](runtime::Gateway)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use objgate::prelude::*;
//!
//! let greet = Method::new(Signature::new("greet").param_or("greeting", "Hello"), |args| {
//!     let greeting: String = args.required("greeting")?;
//!     Ok(json!(format!("{greeting} world!")))
//! });
//!
//! let dispatcher = Dispatcher::builder()
//!     .root(Root::constant(Namespace::new("Controller").method(greet)))
//!     .permissions(&AttributeSpec::list(["greet"]))?
//!     .build()?;
//!
//! let request = Request::new().query_string("attr=greet&greeting=Hi")?;
//! assert_eq!(dispatcher.dispatch(&request)?, json!("Hi world!"));
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use objgate_core as core;
pub use objgate_framework as framework;
pub use objgate_runtime as runtime;

/// Commonly used types.
///
/// ```rust,ignore
/// use objgate::prelude::*;
/// ```
pub mod prelude {
    // Requests, errors and values
    pub use objgate_core::{
        AttrLocator, AttributeSpec, CallError, CallResult, DispatchError, DispatchResult,
        ErrorKind, Request, Value, ValueKind,
    };
    pub use objgate_core::prelude::json;

    // Transform specs
    pub use objgate_core::{Layers, TransSpec, Transform, TransformError};

    // Exposure model
    pub use objgate_framework::{
        Args, CtorArgs, Exposed, Member, Method, Namespace, Root, SharedObject, Signature,
    };

    // Dispatch
    pub use objgate_framework::{Dispatcher, DispatcherBuilder, ReservedNames, envelope, join};

    // Configuration
    pub use objgate_runtime::{CoercionRegistry, GateBuilder, Gateway, Response};
}
