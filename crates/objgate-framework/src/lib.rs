//! # objgate Framework
//!
//! The dispatch pipeline of objgate.
//!
//! This layer provides:
//! - The exposure model: [`Exposed`] objects, [`Method`]s with [`Signature`]s,
//!   and the [`Namespace`] registry
//! - Typed argument extraction via [`Args`]
//! - Root objects and the LRU [`ConstructorCache`]
//! - [`InputCollector`] and [`OutputTransformer`]
//! - The [`Dispatcher`] and its `tower::Service` implementation
//!
//! Everything here is synchronous; transports own all I/O.

pub mod args;
pub mod constructor;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod object;
pub mod output;
pub mod service;

pub use args::Args;
pub use constructor::{
    CacheStats, ConstructFn, ConstructorCache, CtorArgs, DEFAULT_CACHE_SIZE, EvictFn, Root,
};
pub use dispatcher::{
    DispatchContext, Dispatcher, DispatcherBuilder, ReservedNames, Stage, is_truthy,
};
pub use error::{BuildError, ResolveError, ResolveResult};
pub use input::InputCollector;
pub use object::{
    Exposed, Member, Method, MethodFn, Namespace, Param, SharedObject, Signature, lookup_or,
    resolve_path,
};
pub use output::{DEFAULT_RESULT_FIELD, OutputTransformer, envelope, join};
