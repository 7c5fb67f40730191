//! Typed argument extraction for exposed methods.
//!
//! Methods receive their coerced arguments as [`Args`], and pull typed values
//! out of it with serde. Missing or malformed arguments are client faults.
//!
//! # Example
//!
//! ```rust,ignore
//! fn compute(args: &Args) -> CallResult<Value> {
//!     let x: f64 = args.required("x")?;
//!     let y: f64 = args.or("y", 1.0)?;
//!     Ok(json!(x / y))
//! }
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use objgate_core::{CallError, CallResult};

/// The named arguments of a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Map<String, Value>,
}

impl Args {
    /// Wraps a map of named arguments.
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Extracts a required argument.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> CallResult<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| CallError::MissingArgument(name.to_string()))?;
        decode(name, value)
    }

    /// Extracts an optional argument; `null` counts as absent.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> CallResult<Option<T>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => decode(name, value).map(Some),
        }
    }

    /// Extracts an argument, falling back to `default` when absent.
    pub fn or<T: DeserializeOwned>(&self, name: &str, default: T) -> CallResult<T> {
        Ok(self.optional(name)?.unwrap_or(default))
    }

    /// Deserializes all arguments into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> CallResult<T> {
        T::deserialize(Value::Object(self.values.clone()))
            .map_err(|e| CallError::invalid("*", e.to_string()))
    }

    /// Returns the raw value of an argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns `true` if the argument is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over argument names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Returns the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for Args {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

fn decode<T: DeserializeOwned>(name: &str, value: &Value) -> CallResult<T> {
    T::deserialize(value).map_err(|e| CallError::invalid(name, e.to_string()))
}
