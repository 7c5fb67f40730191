//! Input collection.
//!
//! [`InputCollector`] merges the arguments of a [`Request`] into one mapping,
//! coercing each raw value through the input [`TransSpec`]:
//!
//! 1. Per-attribute defaults seed the mapping.
//! 2. Sources are read in the configured order; each value is resolved
//!    against `{source, attr, argname, value}` and transformed if a transform
//!    is found. Later sources override earlier ones.
//! 3. The attribute argument is removed.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::trace;

use objgate_core::{Conditions, DEFAULT_SOURCES, DispatchError, DispatchResult, Request, TransSpec};

/// Collects and coerces request arguments.
#[derive(Debug, Clone)]
pub struct InputCollector {
    spec: TransSpec,
    sources: Vec<String>,
    defaults: HashMap<String, Map<String, Value>>,
    attr_arg: Option<String>,
}

impl Default for InputCollector {
    fn default() -> Self {
        Self {
            spec: TransSpec::empty(),
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            defaults: HashMap::new(),
            attr_arg: Some("attr".to_string()),
        }
    }
}

impl InputCollector {
    /// Creates a collector with no coercions, the default source order and
    /// `attr` as the attribute argument.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the coercion spec.
    pub fn spec(mut self, spec: impl Into<TransSpec>) -> Self {
        self.spec = spec.into();
        self
    }

    /// Sets the source order. Later sources override earlier ones.
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default arguments for `attr`.
    pub fn defaults(mut self, attr: impl Into<String>, args: Map<String, Value>) -> Self {
        self.defaults.insert(attr.into(), args);
        self
    }

    /// Sets the argument carrying the attribute path, which is never collected.
    pub fn attr_arg(mut self, name: Option<String>) -> Self {
        self.attr_arg = name;
        self
    }

    /// Returns the source order.
    pub fn source_order(&self) -> &[String] {
        &self.sources
    }

    /// Collects the arguments of `request` for a call to `attr`.
    pub fn collect(&self, request: &Request, attr: &str) -> DispatchResult<Map<String, Value>> {
        let mut collected = self.defaults.get(attr).cloned().unwrap_or_default();

        for source_name in &self.sources {
            let Some(source) = request.source(source_name) else {
                continue;
            };

            for (name, raw) in source.args() {
                if self.attr_arg.as_deref() == Some(name.as_str()) {
                    continue;
                }

                let cond = Conditions::new(raw)
                    .source(Some(source_name.as_str()))
                    .attr(attr)
                    .argname(name);
                let value = match self.spec.resolve(&cond) {
                    Some(transform) => {
                        trace!(
                            source = %source_name,
                            argument = %name,
                            transform = transform.label(),
                            "Coercing argument"
                        );
                        transform.apply(raw.clone()).map_err(|e| {
                            DispatchError::bad_argument(
                                name,
                                format!("Cannot coerce argument '{name}': {e}"),
                            )
                        })?
                    }
                    None => raw.clone(),
                };
                collected.insert(name.clone(), value);
            }
        }

        if let Some(attr_arg) = &self.attr_arg {
            collected.remove(attr_arg);
        }
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objgate_core::{Layers, QUERY, ROUTE, Transform, TransformError, ValueKind};
    use serde_json::json;

    fn to_float() -> Transform {
        Transform::new("float", |v| match &v {
            Value::String(s) => s
                .parse::<f64>()
                .map(|f| json!(f))
                .map_err(|_| TransformError::parse(s.clone(), "float")),
            Value::Number(_) => Ok(v.clone()),
            other => Err(TransformError::TypeMismatch {
                expected: "string",
                got: objgate_core::kind_name(other),
            }),
        })
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_last_source_wins() {
        let collector = InputCollector::new().sources(["a", "b"]);
        let request = Request::new()
            .with_source("b", [("x", json!("from b"))])
            .with_source("a", [("x", json!("from a"))]);

        let args = collector.collect(&request, "f").unwrap();
        assert_eq!(args["x"], json!("from b"));
    }

    #[test]
    fn test_default_overridden_by_source() {
        let collector = InputCollector::new().defaults("f", object(json!({"x": 1, "y": 5})));
        let request = Request::new().with_source(QUERY, [("x", json!(2))]);

        let args = collector.collect(&request, "f").unwrap();
        assert_eq!(args["x"], json!(2));
        assert_eq!(args["y"], json!(5));

        let other = collector.collect(&request, "g").unwrap();
        assert!(other.get("y").is_none());
    }

    #[test]
    fn test_argname_coercion() {
        let collector = InputCollector::new().spec(Layers::new().argname("x", to_float()));
        let request = Request::new().query_string("attr=calc.compute&x=5&y=3").unwrap();

        let args = collector.collect(&request, "calc.compute").unwrap();
        assert_eq!(args["x"], json!(5.0));
        assert!(args["x"].is_f64());
        assert_eq!(args["y"], json!("3"));
        assert!(!args.contains_key("attr"));
    }

    #[test]
    fn test_coercion_failure_names_argument() {
        let collector = InputCollector::new().spec(Layers::new().argname("x", to_float()));
        let request = Request::new().query_string("x=five").unwrap();

        let err = collector.collect(&request, "calc.compute").unwrap_err();
        match err {
            DispatchError::BadRequest { argument, message } => {
                assert_eq!(argument.as_deref(), Some("x"));
                assert!(message.contains("five"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_source_specific_coercion() {
        let split = Transform::new("split", |v| match v {
            Value::String(s) => Ok(json!(s.split('|').collect::<Vec<_>>())),
            other => Ok(other),
        });
        let spec = Layers::new().argname(
            "items",
            Layers::new()
                .source(QUERY, split)
                .valtype(ValueKind::Array, Transform::new("identity", Ok)),
        );
        let collector = InputCollector::new().spec(spec);

        let query = Request::new().query_string("items=a|b").unwrap();
        let args = collector.collect(&query, "f").unwrap();
        assert_eq!(args["items"], json!(["a", "b"]));

        let body = Request::new().json_body(json!({"items": "a|b"})).unwrap();
        let args = collector.collect(&body, "f").unwrap();
        assert_eq!(args["items"], json!("a|b"));
    }

    #[test]
    fn test_attr_arg_removed_even_from_defaults() {
        let collector = InputCollector::new().defaults("f", object(json!({"attr": "g"})));
        let request = Request::new().route_arg("attr", "f");
        let args = collector.collect(&request, "f").unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_unlisted_sources_are_ignored() {
        let collector = InputCollector::new().sources([ROUTE]);
        let request = Request::new().query_string("x=1").unwrap().route_arg("y", 2);
        let args = collector.collect(&request, "f").unwrap();
        assert!(args.get("x").is_none());
        assert_eq!(args["y"], json!(2));
    }
}
