//! The exposure model.
//!
//! Objects are exposed through the [`Exposed`] trait instead of open-ended
//! runtime introspection: an object answers [`Exposed::member`] for the names
//! it chooses to expose, and nothing else is reachable. A [`Member`] is a
//! nested object, a callable [`Method`], or a plain value.
//!
//! [`Namespace`] is a registry implementation of [`Exposed`] assembled at
//! configuration time, which is enough for most uses:
//!
//! ```rust,ignore
//! let calc = Namespace::new("FloatCalculator")
//!     .value("whoami", "a float calculator")
//!     .method(Method::new(
//!         Signature::new("compute").param("x").param("op").param("y"),
//!         |args| { /* ... */ },
//!     ));
//!
//! let controller = Namespace::new("Controller").object("fcalc", calc);
//! let leaf = resolve_path(&controller.into_shared(), "fcalc.compute")?;
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::args::Args;
use crate::error::{ResolveError, ResolveResult};
use objgate_core::{CallError, CallResult};

/// A shared exposed object.
pub type SharedObject = Arc<dyn Exposed>;

// =============================================================================
// Exposed
// =============================================================================

/// An object whose members can be reached by name.
pub trait Exposed: Send + Sync {
    /// Returns the member called `name`, if exposed.
    fn member(&self, name: &str) -> Option<Member>;

    /// Returns the names of all exposed members.
    fn member_names(&self) -> Vec<String>;

    /// Returns a human-readable type name.
    fn type_name(&self) -> &str {
        "object"
    }

    /// Returns documentation text, if any.
    fn doc(&self) -> Option<&str> {
        None
    }

    /// Snapshot of the plain value members.
    ///
    /// Used as the result when the object itself is the leaf target.
    fn to_value(&self) -> Value {
        let values = self
            .member_names()
            .into_iter()
            .filter_map(|name| match self.member(&name) {
                Some(Member::Value(value)) => Some((name, value)),
                _ => None,
            })
            .collect::<Map<_, _>>();
        Value::Object(values)
    }
}

impl std::fmt::Debug for dyn Exposed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exposed")
            .field("type_name", &self.type_name())
            .field("members", &self.member_names())
            .finish()
    }
}

/// An exposed member.
#[derive(Debug, Clone)]
pub enum Member {
    /// A nested object.
    Object(SharedObject),
    /// A callable.
    Method(Method),
    /// A plain value.
    Value(Value),
}

impl Member {
    /// Returns `true` for methods.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Method(_))
    }

    /// Invokes a method, or returns the member itself as the result.
    pub fn invoke(&self, args: Map<String, Value>) -> CallResult<Value> {
        match self {
            Self::Method(method) => method.call(args),
            Self::Value(value) => Ok(value.clone()),
            Self::Object(object) => Ok(object.to_value()),
        }
    }

    /// Describes the member for help output.
    pub fn describe(&self, path: &str) -> String {
        match self {
            Self::Method(method) => method.signature().describe(),
            Self::Object(object) => match object.doc() {
                Some(doc) => format!("{path}: {}\n{doc}", object.type_name()),
                None => format!("{path}: {}", object.type_name()),
            },
            Self::Value(value) => format!("{path}: {}", objgate_core::kind_name(value)),
        }
    }
}

// =============================================================================
// Methods
// =============================================================================

/// The function behind a [`Method`].
pub type MethodFn = dyn Fn(&Args) -> CallResult<Value> + Send + Sync;

/// A parameter of a [`Signature`].
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Default value, if the parameter is optional.
    pub default: Option<Value>,
}

/// The declared parameters and documentation of a method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
    accepts_extra: bool,
    doc: Option<String>,
}

impl Signature {
    /// Creates a signature without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Adds an optional parameter with a default value.
    pub fn param_or(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Accepts arguments not declared as parameters.
    pub fn extra(mut self) -> Self {
        self.accepts_extra = true;
        self
    }

    /// Sets the documentation text.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Returns the method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns `true` if undeclared arguments are accepted.
    pub fn accepts_extra(&self) -> bool {
        self.accepts_extra
    }

    /// Renders the call description followed by the documentation.
    ///
    /// ```text
    /// compute(x, op, y=1, **kwargs)
    /// A "x op y" operation.
    /// ```
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .params
            .iter()
            .map(|p| match &p.default {
                Some(default) => format!("{}={default}", p.name),
                None => p.name.clone(),
            })
            .collect();
        if self.accepts_extra {
            parts.push("**kwargs".to_string());
        }

        let call = format!("{}({})", self.name, parts.join(", "));
        match &self.doc {
            Some(doc) => format!("{call}\n{doc}"),
            None => call,
        }
    }

    /// Checks `args` against the parameters and fills in defaults.
    pub fn bind(&self, mut args: Map<String, Value>) -> CallResult<Args> {
        if !self.accepts_extra {
            if let Some(unexpected) = args
                .keys()
                .find(|name| !self.params.iter().any(|p| &p.name == *name))
            {
                return Err(CallError::UnexpectedArgument(unexpected.clone()));
            }
        }

        for param in &self.params {
            if args.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    args.insert(param.name.clone(), default.clone());
                }
                None => return Err(CallError::MissingArgument(param.name.clone())),
            }
        }

        Ok(Args::new(args))
    }
}

/// An exposed callable.
#[derive(Clone)]
pub struct Method {
    signature: Arc<Signature>,
    func: Arc<MethodFn>,
}

impl Method {
    /// Creates a method from its signature and body.
    pub fn new<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(&Args) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self {
            signature: Arc::new(signature),
            func: Arc::new(func),
        }
    }

    /// Returns the method name.
    pub fn name(&self) -> &str {
        self.signature.name()
    }

    /// Returns the signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Binds `args` to the signature and calls the body.
    pub fn call(&self, args: Map<String, Value>) -> CallResult<Value> {
        let args = self.signature.bind(args)?;
        (self.func)(&args)
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature.describe())
            .finish()
    }
}

// =============================================================================
// Namespace
// =============================================================================

/// A registry of named members.
#[derive(Clone, Default)]
pub struct Namespace {
    type_name: String,
    doc: Option<String>,
    members: Vec<(String, Member)>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Sets the documentation text.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Exposes a plain value.
    pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name, Member::Value(value.into()))
    }

    /// Exposes a method under its signature name.
    pub fn method(self, method: Method) -> Self {
        let name = method.name().to_string();
        self.member(name, Member::Method(method))
    }

    /// Exposes a nested object.
    pub fn object(self, name: impl Into<String>, object: impl Exposed + 'static) -> Self {
        self.member(name, Member::Object(Arc::new(object)))
    }

    /// Exposes an already shared nested object.
    pub fn shared(self, name: impl Into<String>, object: SharedObject) -> Self {
        self.member(name, Member::Object(object))
    }

    /// Exposes an arbitrary member, replacing any previous one of that name.
    pub fn member(mut self, name: impl Into<String>, member: Member) -> Self {
        let name = name.into();
        match self.members.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name, member)),
        }
        self
    }

    /// Converts the namespace into a shared object.
    pub fn into_shared(self) -> SharedObject {
        Arc::new(self)
    }
}

impl Exposed for Namespace {
    fn member(&self, name: &str) -> Option<Member> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, member)| member.clone())
    }

    fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|(name, _)| name.clone()).collect()
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("type_name", &self.type_name)
            .field("members", &self.member_names())
            .finish()
    }
}

// =============================================================================
// Path Resolution
// =============================================================================

/// Walks the dotted `path` from `root`, failing on the first missing segment.
pub fn resolve_path(root: &SharedObject, path: &str) -> ResolveResult<Member> {
    let mut current = Member::Object(Arc::clone(root));
    let mut walked = root.type_name().to_string();

    for segment in path.split('.') {
        let next = match &current {
            Member::Object(object) => object.member(segment),
            Member::Method(_) | Member::Value(_) => {
                return Err(ResolveError::NotTraversable {
                    segment: segment.to_string(),
                    parent: walked,
                });
            }
        };
        current = next.ok_or_else(|| ResolveError::Missing {
            segment: segment.to_string(),
            parent: walked.clone(),
        })?;
        walked = format!("{walked}.{segment}");
    }

    Ok(current)
}

/// Like [`resolve_path`], returning `default` instead of failing.
pub fn lookup_or(root: &SharedObject, path: &str, default: Member) -> Member {
    resolve_path(root, path).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calc() -> SharedObject {
        let compute = Method::new(
            Signature::new("compute")
                .param("x")
                .param_or("y", 1)
                .doc("Adds x and y."),
            |args| {
                let x: f64 = args.required("x")?;
                let y: f64 = args.required("y")?;
                Ok(json!(x + y))
            },
        );
        Namespace::new("Root")
            .value("name", "root")
            .object(
                "calc",
                Namespace::new("Calculator")
                    .value("whoami", "a calculator")
                    .method(compute),
            )
            .into_shared()
    }

    #[test]
    fn test_resolve_nested_method() {
        let member = resolve_path(&calc(), "calc.compute").unwrap();
        assert!(member.is_callable());

        let mut args = Map::new();
        args.insert("x".into(), json!(2.0));
        assert_eq!(member.invoke(args).unwrap(), json!(3.0));
    }

    #[test]
    fn test_resolve_value_is_result() {
        let member = resolve_path(&calc(), "calc.whoami").unwrap();
        assert_eq!(member.invoke(Map::new()).unwrap(), json!("a calculator"));
    }

    #[test]
    fn test_object_leaf_snapshots_values() {
        let member = resolve_path(&calc(), "calc").unwrap();
        assert_eq!(
            member.invoke(Map::new()).unwrap(),
            json!({"whoami": "a calculator"})
        );
    }

    #[test]
    fn test_missing_segment() {
        let err = resolve_path(&calc(), "calc.nope").unwrap_err();
        assert_eq!(
            err,
            ResolveError::Missing {
                segment: "nope".into(),
                parent: "Root.calc".into(),
            }
        );
        assert!(matches!(
            resolve_path(&calc(), "name.len"),
            Err(ResolveError::NotTraversable { .. })
        ));
        assert!(resolve_path(&calc(), "").is_err());
    }

    #[test]
    fn test_lookup_or_default() {
        let member = lookup_or(&calc(), "nope", Member::Value(json!(0)));
        assert!(matches!(member, Member::Value(v) if v == json!(0)));
    }

    #[test]
    fn test_bind_rejects_unexpected() {
        let sig = Signature::new("f").param("a");
        let mut args = Map::new();
        args.insert("a".into(), json!(1));
        args.insert("b".into(), json!(2));
        assert!(matches!(
            sig.bind(args.clone()),
            Err(CallError::UnexpectedArgument(name)) if name == "b"
        ));
        assert!(sig.extra().bind(args).is_ok());
    }

    #[test]
    fn test_bind_requires_params_without_default() {
        let sig = Signature::new("f").param("a").param_or("b", 3);
        assert!(matches!(
            sig.bind(Map::new()),
            Err(CallError::MissingArgument(name)) if name == "a"
        ));

        let mut args = Map::new();
        args.insert("a".into(), json!(1));
        assert_eq!(sig.bind(args).unwrap().get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_describe() {
        let sig = Signature::new("foo")
            .param("a")
            .param_or("b", 3)
            .param_or("c", "as")
            .param_or("ddd", Value::Null)
            .extra()
            .doc("some documentation...");
        assert_eq!(
            sig.describe(),
            "foo(a, b=3, c=\"as\", ddd=null, **kwargs)\nsome documentation..."
        );
        assert_eq!(Signature::new("greet").describe(), "greet()");
    }
}
