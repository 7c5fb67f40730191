//! Named coercions and compilation of configured transform specs.
//!
//! Configuration files cannot hold functions, so a [`TransRule`] refers to
//! transforms by name. A [`CoercionRegistry`] maps those names to
//! [`Transform`]s and compiles rules into [`TransSpec`]s.
//!
//! | name       | effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `identity` | value unchanged                                          |
//! | `str`      | strings unchanged, everything else rendered as JSON text |
//! | `int`      | integer from a string, integer or integral float         |
//! | `float`    | float from a string or number                            |
//! | `bool`     | boolean from `true/false`, `1/0`, `yes/no`, `on/off`     |
//! | `json`     | parses a string as JSON                                  |
//! | `list`     | splits a string on commas                                |
//! | `csv`      | joins an array with commas                               |
//! | `envelope` | wraps the value as `{"result": value}`                   |
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = CoercionRegistry::with_builtins();
//! registry.register("upper", Transform::new("upper", |v| {
//!     Ok(v.as_str().map(|s| Value::from(s.to_uppercase())).unwrap_or(v))
//! }));
//! let spec = registry.compile(&settings.input)?;
//! ```

use std::collections::HashMap;

use objgate_core::{Layers, TransSpec, Transform, TransformError, kind_name};
use objgate_framework::{DEFAULT_RESULT_FIELD, envelope, join};
use serde_json::{Number, Value};
use tracing::trace;

use crate::config::{ConfigError, ConfigResult, TransRule};

/// Registry of named transforms.
#[derive(Debug, Clone, Default)]
pub struct CoercionRegistry {
    entries: HashMap<String, Transform>,
}

impl CoercionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in coercions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("identity", Transform::new("identity", Ok));
        registry.register("str", to_str());
        registry.register("int", to_int());
        registry.register("float", to_float());
        registry.register("bool", to_bool());
        registry.register("json", parse_json());
        registry.register("list", split_list());
        registry.register("csv", join(","));
        registry.register("envelope", envelope(DEFAULT_RESULT_FIELD));
        registry
    }

    /// Registers `transform` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, transform: Transform) -> &mut Self {
        self.entries.insert(name.into(), transform);
        self
    }

    /// Returns the transform registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Transform> {
        self.entries.get(name)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Compiles a configured rule into a transform spec.
    ///
    /// Fails with [`ConfigError::UnknownCoercion`] on the first unregistered name.
    pub fn compile(&self, rule: &TransRule) -> ConfigResult<TransSpec> {
        match rule {
            TransRule::Named(name) => {
                let transform = self
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownCoercion(name.clone()))?;
                trace!(name = %name, "Resolved coercion");
                Ok(TransSpec::Func(transform))
            }
            TransRule::Layers(rules) => {
                let mut layers = Layers::new();
                for (source, rule) in &rules.source {
                    layers = layers.source(source.clone(), self.compile(rule)?);
                }
                for (attr, rule) in &rules.attr {
                    layers = layers.attr(attr.clone(), self.compile(rule)?);
                }
                for (argname, rule) in &rules.argname {
                    layers = layers.argname(argname.clone(), self.compile(rule)?);
                }
                for branch in &rules.valtype {
                    layers = layers.valtype(branch.kind, self.compile(&branch.apply)?);
                }
                if let Some(fallback) = &rules.fallback {
                    layers = layers.otherwise(self.compile(fallback)?);
                }
                Ok(layers.into())
            }
        }
    }
}

// =============================================================================
// Built-in Coercions
// =============================================================================

/// Renders non-string values as JSON text.
pub fn to_str() -> Transform {
    Transform::new("str", |value| match value {
        Value::String(_) => Ok(value),
        other => Ok(Value::String(other.to_string())),
    })
}

/// Coerces to an integer.
pub fn to_int() -> Transform {
    Transform::new("int", |value| match &value {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| TransformError::parse(s.clone(), "int")),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
            _ => Err(TransformError::parse(n.to_string(), "int")),
        },
        other => Err(TransformError::TypeMismatch {
            expected: "integer",
            got: kind_name(other),
        }),
    })
}

/// Coerces to a float.
pub fn to_float() -> Transform {
    Transform::new("float", |value| {
        let parsed = match &value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| TransformError::parse(s.clone(), "float"))?,
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| TransformError::parse(n.to_string(), "float"))?,
            other => {
                return Err(TransformError::TypeMismatch {
                    expected: "number",
                    got: kind_name(other),
                });
            }
        };
        Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(|| TransformError::custom(format!("{parsed} is not a finite number")))
    })
}

/// Coerces to a boolean.
pub fn to_bool() -> Transform {
    Transform::new("bool", |value| match &value {
        Value::Bool(_) => Ok(value),
        Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
            _ => Err(TransformError::parse(s.clone(), "bool")),
        },
        other => Err(TransformError::TypeMismatch {
            expected: "boolean",
            got: kind_name(other),
        }),
    })
}

/// Parses strings as JSON; other values pass through.
pub fn parse_json() -> Transform {
    Transform::new("json", |value| match &value {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| TransformError::custom(format!("invalid JSON: {e}"))),
        _ => Ok(value),
    })
}

/// Splits strings on commas; arrays pass through and scalars become singletons.
pub fn split_list() -> Transform {
    Transform::new("list", |value| match value {
        Value::String(s) => Ok(Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from)
                .collect(),
        )),
        Value::Array(_) => Ok(value),
        Value::Null => Ok(Value::Array(Vec::new())),
        other => Ok(Value::Array(vec![other])),
    })
}
