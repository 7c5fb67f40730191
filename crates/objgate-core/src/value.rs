//! Value kinds used by the value-type axis of transform specs.
//!
//! Arguments and results are plain [`serde_json::Value`]s. A [`ValueKind`]
//! is a tag over those values with subtype compatibility: [`ValueKind::Number`]
//! admits both integers and floats, [`ValueKind::Scalar`] admits every
//! non-collection value, and [`ValueKind::Any`] admits everything.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A runtime type tag for [`Value`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Every value.
    Any,
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// Any number.
    Number,
    /// Numbers representable as `i64` or `u64`.
    Integer,
    /// Floating point numbers.
    Float,
    /// Strings.
    String,
    /// Arrays.
    Array,
    /// Objects (mappings).
    Object,
    /// Null, booleans, numbers and strings.
    Scalar,
    /// Arrays and objects.
    Collection,
}

impl ValueKind {
    /// Returns `true` if `value` is an instance of this kind.
    pub fn admits(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Scalar => !matches!(value, Value::Array(_) | Value::Object(_)),
            Self::Collection => matches!(value, Value::Array(_) | Value::Object(_)),
        }
    }

    /// Returns the most specific kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Integer,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns the lower-case name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Scalar => "scalar",
            Self::Collection => "collection",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the most specific kind of `value`, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    ValueKind::of(value).as_str()
}
