//! The dispatch pipeline.
//!
//! A [`Dispatcher`] turns a [`Request`] into a payload:
//!
//! ```text
//! Idle ─▶ AttributeResolved ─▶ PermissionChecked ─▶ InputCollected
//!      ─▶ TargetResolved ─▶ Invoked ─▶ OutputTransformed ─▶ Done
//! ```
//!
//! Any stage may fail with a [`DispatchError`]:
//!
//! | Stage | Failure | Kind |
//! |---|---|---|
//! | AttributeResolved | no attribute in the request | `MissingAttribute` |
//! | PermissionChecked | attribute not permitted | `ForbiddenAttribute` |
//! | InputCollected | coercion failed | `BadRequest` |
//! | TargetResolved | bad constructor arguments | `BadRequest` |
//! | TargetResolved | no such attribute | `ForbiddenAttribute` |
//! | Invoked | bad call arguments | `BadRequest` |
//! | Invoked, OutputTransformed | the target or transform failed | `Unhandled` |
//!
//! # Example
//!
//! ```rust,ignore
//! use objgate_framework::{Dispatcher, Root};
//!
//! let dispatcher = Dispatcher::builder()
//!     .root(Root::constructor(make_controller))
//!     .permissions(&AttributeSpec::list(["greet", "fcalc.compute"]))?
//!     .input(Layers::new().argname("x", to_float))
//!     .constructor_args(["user"])
//!     .build()?;
//!
//! let payload = dispatcher.dispatch(&Request::new().query_string("attr=greet&user=ann")?)?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, debug_span, error, trace};

use crate::constructor::{ConstructorCache, CtorArgs, DEFAULT_CACHE_SIZE, Root};
use crate::error::BuildError;
use crate::input::InputCollector;
use crate::object::{SharedObject, resolve_path};
use crate::output::OutputTransformer;
use objgate_core::{
    AttrLocator, AttributeMatcher, AttributeSpec, CallError, DispatchError, DispatchResult,
    PatternError, Request, TransSpec,
};

// =============================================================================
// Reserved Names
// =============================================================================

/// Argument names with a special meaning to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservedNames {
    /// Carries the attribute path.
    pub attr: String,
    /// Requests help text instead of a call.
    pub help: String,
    /// Selects an output transform branch.
    pub output_mode: String,
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self {
            attr: "attr".to_string(),
            help: "_help".to_string(),
            output_mode: "_output_trans".to_string(),
        }
    }
}

/// Truthiness of a help flag.
///
/// `null`, `false`, `0`, `""`, `"0"`, `"false"`, `"no"` and empty
/// collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(s.to_ascii_lowercase().as_str(), "" | "0" | "false" | "no"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// =============================================================================
// Dispatch Context
// =============================================================================

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    AttributeResolved,
    PermissionChecked,
    InputCollected,
    TargetResolved,
    Invoked,
    OutputTransformed,
    Done,
}

impl Stage {
    /// Returns the stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AttributeResolved => "attribute_resolved",
            Self::PermissionChecked => "permission_checked",
            Self::InputCollected => "input_collected",
            Self::TargetResolved => "target_resolved",
            Self::Invoked => "invoked",
            Self::OutputTransformed => "output_transformed",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that has passed the permission check and input collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchContext {
    /// The permitted attribute path.
    pub attr: String,
    /// Coerced call arguments, without reserved or constructor arguments.
    pub args: Map<String, Value>,
    /// Arguments for the root object.
    pub ctor_args: CtorArgs,
    /// Whether help text was requested.
    pub help: bool,
    /// The selected output mode.
    pub output_mode: Option<String>,
}

impl DispatchContext {
    fn split(
        attr: String,
        mut args: Map<String, Value>,
        ctor_names: &[String],
        reserved: &ReservedNames,
    ) -> DispatchResult<Self> {
        let help = args.remove(&reserved.help).is_some_and(|v| is_truthy(&v));

        let output_mode = match args.remove(&reserved.output_mode) {
            None | Some(Value::Null) => None,
            Some(Value::String(mode)) => Some(mode),
            Some(_) => {
                return Err(DispatchError::bad_argument(
                    &reserved.output_mode,
                    "The output mode must be a string",
                ));
            }
        };

        let ctor_args = ctor_names
            .iter()
            .filter_map(|name| args.remove(name).map(|value| (name.clone(), value)))
            .collect::<Map<_, _>>();

        Ok(Self {
            attr,
            args,
            ctor_args: CtorArgs::named(ctor_args),
            help,
            output_mode,
        })
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

struct Inner {
    root: Root,
    matcher: AttributeMatcher,
    input: InputCollector,
    output: OutputTransformer,
    ctor_names: Vec<String>,
    reserved: ReservedNames,
    locator: AttrLocator,
    cache: ConstructorCache,
}

/// Dispatches requests to an exposed object graph.
///
/// Cloning is cheap; clones share the constructor cache.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a builder.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Returns `true` if `attr` passes the permission policy.
    pub fn permits(&self, attr: &str) -> bool {
        self.inner.matcher.permits(attr)
    }

    /// Returns the permission matcher.
    pub fn matcher(&self) -> &AttributeMatcher {
        &self.inner.matcher
    }

    /// Returns the constructor cache.
    pub fn cache(&self) -> &ConstructorCache {
        &self.inner.cache
    }

    /// Returns the reserved argument names.
    pub fn reserved(&self) -> &ReservedNames {
        &self.inner.reserved
    }

    /// Returns the root object for `args`, constructing it if needed.
    pub fn root_object(&self, args: &CtorArgs) -> Result<SharedObject, CallError> {
        self.inner.root.resolve(args, &self.inner.cache)
    }

    /// Extracts the attribute path of `request`.
    pub fn locate(&self, request: &Request) -> DispatchResult<String> {
        self.inner
            .locator
            .locate(request)
            .ok_or(DispatchError::MissingAttribute)
    }

    /// Runs the stages up to input collection.
    pub fn prepare(&self, request: &Request) -> DispatchResult<DispatchContext> {
        let attr = self.locate(request)?;
        self.prepare_for(attr, request)
    }

    fn prepare_for(&self, attr: String, request: &Request) -> DispatchResult<DispatchContext> {
        trace!(stage = %Stage::AttributeResolved);

        if !self.permits(&attr) {
            return Err(DispatchError::forbidden(attr));
        }
        trace!(stage = %Stage::PermissionChecked);

        let args = self.inner.input.collect(request, &attr)?;
        let ctx = DispatchContext::split(attr, args, &self.inner.ctor_names, &self.inner.reserved)?;
        trace!(stage = %Stage::InputCollected, args = ctx.args.len());
        Ok(ctx)
    }

    /// Runs the stages after input collection.
    pub fn execute(&self, ctx: DispatchContext) -> DispatchResult<Value> {
        let DispatchContext {
            attr,
            args,
            ctor_args,
            help,
            output_mode,
        } = ctx;

        let root = self
            .root_object(&ctor_args)
            .map_err(|e| classify_call_error(&attr, e))?;
        let target = resolve_path(&root, &attr).map_err(|e| {
            debug!(error = %e, "Attribute path does not resolve");
            DispatchError::forbidden(&attr)
        })?;
        trace!(stage = %Stage::TargetResolved, callable = target.is_callable());

        if help {
            return Ok(Value::String(target.describe(&attr)));
        }

        let result = target
            .invoke(args)
            .map_err(|e| classify_call_error(&attr, e))?;
        trace!(stage = %Stage::Invoked);

        let payload = self
            .inner
            .output
            .transform(result, &attr, output_mode.as_deref())
            .map_err(|e| DispatchError::unhandled(&attr, e))?;
        trace!(stage = %Stage::OutputTransformed);
        Ok(payload)
    }

    /// Dispatches `request`.
    pub fn dispatch(&self, request: &Request) -> DispatchResult<Value> {
        trace!(stage = %Stage::Idle);
        let attr = match self.locate(request) {
            Ok(attr) => attr,
            Err(e) => {
                debug!(kind = %e.kind(), "Dispatch rejected: {e}");
                return Err(e);
            }
        };

        let span = debug_span!("dispatch", attr = %attr);
        let _enter = span.enter();

        let result = self
            .prepare_for(attr, request)
            .and_then(|ctx| self.execute(ctx));

        match &result {
            Ok(_) => trace!(stage = %Stage::Done),
            Err(DispatchError::Unhandled { source, .. }) => {
                error!(error = %format!("{source:#}"), "Dispatch failed");
            }
            Err(e) => debug!(kind = %e.kind(), "Dispatch rejected: {e}"),
        }
        result
    }
}

fn classify_call_error(attr: &str, err: CallError) -> DispatchError {
    match err {
        CallError::Failed(source) => DispatchError::unhandled(attr, source),
        CallError::MissingArgument(name) => {
            DispatchError::bad_argument(&name, format!("Missing required argument '{name}'"))
        }
        CallError::UnexpectedArgument(name) => {
            DispatchError::bad_argument(&name, format!("Unexpected argument '{name}'"))
        }
        CallError::InvalidArgument { name, reason } => {
            DispatchError::bad_argument(&name, format!("Invalid argument '{name}': {reason}"))
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.inner.root)
            .field("matcher", &self.inner.matcher)
            .field("constructor_args", &self.inner.ctor_names)
            .field("cache", &self.inner.cache)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Dispatcher`].
///
/// Nothing is permitted unless a permission policy is configured.
pub struct DispatcherBuilder {
    root: Option<Root>,
    matcher: AttributeMatcher,
    input: InputCollector,
    output: OutputTransformer,
    ctor_names: Vec<String>,
    reserved: ReservedNames,
    locator: Option<AttrLocator>,
    cache: Option<ConstructorCache>,
    cache_size: usize,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            root: None,
            matcher: AttributeMatcher::deny_all(),
            input: InputCollector::new(),
            output: OutputTransformer::identity(),
            ctor_names: Vec::new(),
            reserved: ReservedNames::default(),
            locator: None,
            cache: None,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl DispatcherBuilder {
    /// Sets the root object or constructor.
    pub fn root(mut self, root: Root) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the permission matcher.
    pub fn matcher(mut self, matcher: AttributeMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Compiles and sets the permission policy.
    pub fn permissions(self, spec: &AttributeSpec) -> Result<Self, PatternError> {
        Ok(self.matcher(AttributeMatcher::compile(spec)?))
    }

    /// Sets the input coercion spec.
    pub fn input(mut self, spec: impl Into<TransSpec>) -> Self {
        self.input = self.input.spec(spec);
        self
    }

    /// Sets the source order.
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = self.input.sources(sources);
        self
    }

    /// Sets default arguments for `attr`.
    pub fn defaults(mut self, attr: impl Into<String>, args: Map<String, Value>) -> Self {
        self.input = self.input.defaults(attr, args);
        self
    }

    /// Sets the output transform spec.
    pub fn output(mut self, spec: impl Into<TransSpec>) -> Self {
        self.output = OutputTransformer::new(spec);
        self
    }

    /// Sets the names of arguments redirected to root construction.
    pub fn constructor_args<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctor_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the reserved argument names.
    pub fn reserved(mut self, reserved: ReservedNames) -> Self {
        self.reserved = reserved;
        self
    }

    /// Sets where the attribute path is read from.
    ///
    /// Defaults to the reserved attribute argument in `route`, then `query`.
    pub fn locator(mut self, locator: AttrLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Sets the constructor cache capacity; zero disables caching.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Uses a preconfigured constructor cache, overriding `cache_size`.
    pub fn cache(mut self, cache: ConstructorCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let root = self.root.ok_or(BuildError::MissingRoot)?;

        if self.input.source_order().is_empty() {
            return Err(BuildError::NoSources);
        }

        let mut seen = HashSet::new();
        let reserved = [
            &self.reserved.attr,
            &self.reserved.help,
            &self.reserved.output_mode,
        ];
        for name in reserved.into_iter().chain(&self.ctor_names) {
            if !seen.insert(name.as_str()) {
                return Err(BuildError::NameCollision(name.clone()));
            }
        }

        let locator = self
            .locator
            .unwrap_or_else(|| AttrLocator::argument(self.reserved.attr.clone()));
        let input = self
            .input
            .attr_arg(locator.argument_name().map(str::to_string));
        let cache = self
            .cache
            .unwrap_or_else(|| ConstructorCache::new(self.cache_size));

        debug!(
            constant_root = root.is_constant(),
            pattern = self.matcher.pattern().unwrap_or("<closed>"),
            cache_size = cache.capacity(),
            "Dispatcher built"
        );

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                root,
                matcher: self.matcher,
                input,
                output: self.output,
                ctor_names: self.ctor_names,
                reserved: self.reserved,
                locator,
                cache,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Method, Namespace, Signature};
    use objgate_core::{ErrorKind, Layers, Transform};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_root() -> Root {
        let echo = Method::new(Signature::new("echo").extra(), |args| {
            Ok(Value::Object(args.clone().into_map()))
        });
        Root::constant(
            Namespace::new("Echo")
                .method(echo)
                .value("version", "1.0"),
        )
    }

    fn echo_dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .root(echo_root())
            .permissions(&AttributeSpec::list(["echo", "version", "missing"]))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!("0"), json!("False"), json!("no"), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!("1"), json!("yes"), json!([0]), json!({"a": 0})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_reserved_args_are_stripped() {
        let dispatcher = echo_dispatcher();
        let request = Request::new()
            .query_string("attr=echo&a=1&_output_trans=raw&_help=0")
            .unwrap();

        let payload = dispatcher.dispatch(&request).unwrap();
        assert_eq!(payload, json!({"a": "1"}));
    }

    #[test]
    fn test_help_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let method = Method::new(
            Signature::new("work").param_or("n", 1).doc("Does work."),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            },
        );
        let dispatcher = Dispatcher::builder()
            .root(Root::constant(Namespace::new("Root").method(method)))
            .permissions(&AttributeSpec::list(["work"]))
            .unwrap()
            .output(Transform::new("fail", |_| {
                Err(objgate_core::TransformError::custom("not applied to help"))
            }))
            .build()
            .unwrap();

        let request = Request::new().query_string("attr=work&_help=1").unwrap();
        let payload = dispatcher.dispatch(&request).unwrap();

        assert_eq!(payload, json!("work(n=1)\nDoes work."));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_output_mode_selects_branch() {
        let dispatcher = Dispatcher::builder()
            .root(echo_root())
            .permissions(&AttributeSpec::list(["version"]))
            .unwrap()
            .output(
                Layers::new()
                    .output_mode("wrapped", crate::output::envelope("v"))
                    .otherwise(Transform::new("upper", |v| {
                        Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))
                    })),
            )
            .build()
            .unwrap();

        let plain = Request::new().query_string("attr=version").unwrap();
        assert_eq!(dispatcher.dispatch(&plain).unwrap(), json!("1.0"));

        let wrapped = Request::new()
            .query_string("attr=version&_output_trans=wrapped")
            .unwrap();
        assert_eq!(dispatcher.dispatch(&wrapped).unwrap(), json!({"v": "1.0"}));
    }

    #[test]
    fn test_non_string_output_mode_is_bad_request() {
        let dispatcher = echo_dispatcher();
        let request = Request::new()
            .route_arg("attr", "echo")
            .route_arg("_output_trans", 3);
        let err = dispatcher.dispatch(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_permitted_but_missing_is_forbidden() {
        let dispatcher = echo_dispatcher();
        let request = Request::new().query_string("attr=missing").unwrap();
        let err = dispatcher.dispatch(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
    }

    #[test]
    fn test_call_errors_are_classified() {
        let strict = Method::new(Signature::new("strict").param("n"), |args| {
            let n: i64 = args.required("n")?;
            if n < 0 {
                return Err(CallError::failed("negative input reached the database"));
            }
            Ok(json!(n))
        });
        let dispatcher = Dispatcher::builder()
            .root(Root::constant(Namespace::new("Root").method(strict)))
            .permissions(&AttributeSpec::list(["strict"]))
            .unwrap()
            .build()
            .unwrap();

        let missing = Request::new().route_arg("attr", "strict");
        assert_eq!(dispatcher.dispatch(&missing).unwrap_err().kind(), ErrorKind::BadRequest);

        let unexpected = Request::new().route_arg("attr", "strict").route_arg("n", 1).route_arg("m", 2);
        assert_eq!(dispatcher.dispatch(&unexpected).unwrap_err().kind(), ErrorKind::BadRequest);

        let malformed = Request::new().route_arg("attr", "strict").route_arg("n", "x");
        assert_eq!(dispatcher.dispatch(&malformed).unwrap_err().kind(), ErrorKind::BadRequest);

        let failing = Request::new().route_arg("attr", "strict").route_arg("n", -1);
        let err = dispatcher.dispatch(&failing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unhandled);
        assert!(!err.payload().message.contains("database"));
    }

    #[test]
    fn test_prepare_splits_context() {
        let dispatcher = Dispatcher::builder()
            .root(echo_root())
            .permissions(&AttributeSpec::list(["echo"]))
            .unwrap()
            .constructor_args(["user"])
            .build()
            .unwrap();
        let request = Request::new()
            .query_string("attr=echo&user=ann&x=1&_help=yes&_output_trans=csv")
            .unwrap();

        let ctx = dispatcher.prepare(&request).unwrap();
        assert_eq!(ctx.attr, "echo");
        assert_eq!(ctx.args.keys().collect::<Vec<_>>(), ["x"]);
        assert_eq!(ctx.ctor_args.get("user"), Some(&json!("ann")));
        assert!(ctx.help);
        assert_eq!(ctx.output_mode.as_deref(), Some("csv"));
    }

    #[test]
    fn test_path_locator() {
        let dispatcher = Dispatcher::builder()
            .root(echo_root())
            .permissions(&AttributeSpec::list(["version"]))
            .unwrap()
            .locator(AttrLocator::path_pattern(r"^/ws/([\w.]+)$").unwrap())
            .build()
            .unwrap();

        let request = Request::new().path("/ws/version");
        assert_eq!(dispatcher.dispatch(&request).unwrap(), json!("1.0"));
        assert!(matches!(
            dispatcher.dispatch(&Request::new().path("/elsewhere")),
            Err(DispatchError::MissingAttribute)
        ));
    }

    #[test]
    fn test_build_rejects_name_collisions() {
        let err = Dispatcher::builder()
            .root(echo_root())
            .constructor_args(["attr"])
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::NameCollision("attr".into()));

        assert_eq!(
            Dispatcher::builder().build().unwrap_err(),
            BuildError::MissingRoot
        );
        assert_eq!(
            Dispatcher::builder()
                .root(echo_root())
                .sources(Vec::<String>::new())
                .build()
                .unwrap_err(),
            BuildError::NoSources
        );
    }

    #[test]
    fn test_unconfigured_dispatcher_is_closed() {
        let dispatcher = Dispatcher::builder().root(echo_root()).build().unwrap();
        assert!(!dispatcher.permits("echo"));
        let request = Request::new().query_string("attr=echo").unwrap();
        assert_eq!(
            dispatcher.dispatch(&request).unwrap_err().kind(),
            ErrorKind::ForbiddenAttribute
        );
    }
}
