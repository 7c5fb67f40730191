//! Output transformation.
//!
//! [`OutputTransformer`] picks one [`Transform`] for a call result by
//! resolving the output [`TransSpec`] against `{output mode, attr, value}`.
//! When nothing resolves the result is returned unchanged.

use serde_json::{Map, Value};

use objgate_core::{Conditions, TransSpec, Transform, TransformResult};

/// Field name used by [`envelope`] in the default configuration.
pub const DEFAULT_RESULT_FIELD: &str = "result";

/// Converts call results into payloads.
#[derive(Debug, Clone, Default)]
pub struct OutputTransformer {
    spec: TransSpec,
}

impl OutputTransformer {
    /// Creates a transformer from a spec.
    ///
    /// A bare [`Transform`] applies to every result.
    pub fn new(spec: impl Into<TransSpec>) -> Self {
        Self { spec: spec.into() }
    }

    /// A transformer returning results unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Transforms `result` of a call to `attr`.
    pub fn transform(&self, result: Value, attr: &str, mode: Option<&str>) -> TransformResult<Value> {
        let transform = {
            let cond = Conditions::new(&result).source(mode).attr(attr);
            self.spec.resolve(&cond)
        };
        match transform {
            Some(transform) => transform.apply(result),
            None => Ok(result),
        }
    }
}

/// Wraps every value as `{field: value}`.
pub fn envelope(field: impl Into<String>) -> Transform {
    let field = field.into();
    Transform::new(format!("envelope({field})"), move |value| {
        let mut wrapped = Map::new();
        wrapped.insert(field.clone(), value);
        Ok(Value::Object(wrapped))
    })
}

/// Renders arrays as a single string joined by `sep`; other values pass through.
pub fn join(sep: impl Into<String>) -> Transform {
    let sep = sep.into();
    Transform::new(format!("join({sep})"), move |value| match value {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            Ok(Value::String(parts.join(&sep)))
        }
        other => Ok(other),
    })
}
