//! Layered conditional transform specifications.
//!
//! A [`TransSpec`] decides which [`Transform`] applies to a value, given the
//! conditions under which the value was produced: the request source it came
//! from, the attribute path being dispatched, the argument name, and the
//! runtime kind of the value itself.
//!
//! # Resolution Order
//!
//! A spec is either a transform (terminal) or a set of [`Layers`]. Layers are
//! searched depth-first in a fixed order, returning as soon as a nested spec
//! resolves:
//!
//! 1. `source` (input) or output mode (output), when the condition is present
//! 2. `attr`
//! 3. `argname`
//! 4. `valtype`, in declaration order; the first admitting kind is taken
//! 5. `fallback`
//!
//! Empty layers resolve to nothing, and the caller falls back to its own
//! `fallback` branch.
//!
//! # Example
//!
//! ```rust,ignore
//! use objgate_core::{Layers, Transform, TransSpec};
//!
//! let spec: TransSpec = Layers::new()
//!     .argname("x", Transform::new("float", to_float))
//!     .attr(
//!         "special",
//!         Layers::new().argname("x", Transform::new("int", to_int)),
//!     )
//!     .into();
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::TransformResult;
use crate::value::ValueKind;

/// The function behind a [`Transform`].
pub type TransformFn = dyn Fn(Value) -> TransformResult<Value> + Send + Sync;

/// A named, shareable value transform.
#[derive(Clone)]
pub struct Transform {
    label: Cow<'static, str>,
    func: Arc<TransformFn>,
}

impl Transform {
    /// Creates a transform with a label used in logs.
    pub fn new<F>(label: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(Value) -> TransformResult<Value> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    /// Creates an unlabelled transform.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(Value) -> TransformResult<Value> + Send + Sync + 'static,
    {
        Self::new("<fn>", func)
    }

    /// Returns the label of this transform.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Applies the transform to `value`.
    pub fn apply(&self, value: Value) -> TransformResult<Value> {
        (self.func)(value)
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transform").field(&self.label).finish()
    }
}

/// The conditions a value is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct Conditions<'a> {
    /// Source name (input) or output mode (output).
    pub source: Option<&'a str>,
    /// Attribute path being dispatched.
    pub attr: Option<&'a str>,
    /// Argument name (input only).
    pub argname: Option<&'a str>,
    /// The value whose kind is inspected.
    pub value: &'a Value,
}

impl<'a> Conditions<'a> {
    /// Creates conditions carrying only a value.
    pub fn new(value: &'a Value) -> Self {
        Self {
            source: None,
            attr: None,
            argname: None,
            value,
        }
    }

    /// Sets the source (or output mode) condition.
    pub fn source(mut self, source: Option<&'a str>) -> Self {
        self.source = source;
        self
    }

    /// Sets the attribute condition.
    pub fn attr(mut self, attr: &'a str) -> Self {
        self.attr = Some(attr);
        self
    }

    /// Sets the argument name condition.
    pub fn argname(mut self, argname: &'a str) -> Self {
        self.argname = Some(argname);
        self
    }
}

/// A recursive transform specification.
#[derive(Debug, Clone)]
pub enum TransSpec {
    /// A terminal transform.
    Func(Transform),
    /// Conditional layers.
    Layers(Box<Layers>),
}

impl Default for TransSpec {
    fn default() -> Self {
        Self::empty()
    }
}

impl TransSpec {
    /// A spec that never resolves.
    pub fn empty() -> Self {
        Self::Layers(Box::default())
    }

    /// Returns `true` if this spec can never resolve.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Func(_) => false,
            Self::Layers(layers) => layers.is_empty(),
        }
    }

    /// Resolves the transform that applies under `cond`, if any.
    pub fn resolve<'s>(&'s self, cond: &Conditions<'_>) -> Option<&'s Transform> {
        match self {
            Self::Func(transform) => Some(transform),
            Self::Layers(layers) => layers.resolve(cond),
        }
    }
}

impl From<Transform> for TransSpec {
    fn from(transform: Transform) -> Self {
        Self::Func(transform)
    }
}

impl From<Layers> for TransSpec {
    fn from(layers: Layers) -> Self {
        Self::Layers(Box::new(layers))
    }
}

/// The conditional layers of a [`TransSpec`].
#[derive(Debug, Clone, Default)]
pub struct Layers {
    source: HashMap<String, TransSpec>,
    attr: HashMap<String, TransSpec>,
    argname: HashMap<String, TransSpec>,
    valtype: Vec<(ValueKind, TransSpec)>,
    fallback: Option<TransSpec>,
}

impl Layers {
    /// Creates empty layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a branch on the request source.
    pub fn source(mut self, source: impl Into<String>, spec: impl Into<TransSpec>) -> Self {
        self.source.insert(source.into(), spec.into());
        self
    }

    /// Adds a branch on the output mode.
    ///
    /// Output specs use the source axis for the output mode.
    pub fn output_mode(self, mode: impl Into<String>, spec: impl Into<TransSpec>) -> Self {
        self.source(mode, spec)
    }

    /// Adds a branch on the attribute path.
    pub fn attr(mut self, attr: impl Into<String>, spec: impl Into<TransSpec>) -> Self {
        self.attr.insert(attr.into(), spec.into());
        self
    }

    /// Adds a branch on the argument name.
    pub fn argname(mut self, argname: impl Into<String>, spec: impl Into<TransSpec>) -> Self {
        self.argname.insert(argname.into(), spec.into());
        self
    }

    /// Appends a branch on the value kind.
    ///
    /// Kinds are tried in the order they are added.
    pub fn valtype(mut self, kind: ValueKind, spec: impl Into<TransSpec>) -> Self {
        self.valtype.push((kind, spec.into()));
        self
    }

    /// Sets the fallback branch.
    pub fn otherwise(mut self, spec: impl Into<TransSpec>) -> Self {
        self.fallback = Some(spec.into());
        self
    }

    /// Returns `true` if no branch is configured.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
            && self.attr.is_empty()
            && self.argname.is_empty()
            && self.valtype.is_empty()
            && self.fallback.is_none()
    }

    fn resolve<'s>(&'s self, cond: &Conditions<'_>) -> Option<&'s Transform> {
        if self.is_empty() {
            return None;
        }

        let keyed = [
            (&self.source, cond.source),
            (&self.attr, cond.attr),
            (&self.argname, cond.argname),
        ];
        for (branches, key) in keyed {
            let found = key
                .and_then(|key| branches.get(key))
                .and_then(|spec| spec.resolve(cond));
            if found.is_some() {
                return found;
            }
        }

        if let Some((_, spec)) = self
            .valtype
            .iter()
            .find(|(kind, _)| kind.admits(cond.value))
        {
            if let Some(transform) = spec.resolve(cond) {
                return Some(transform);
            }
        }

        self.fallback.as_ref().and_then(|spec| spec.resolve(cond))
    }
}
