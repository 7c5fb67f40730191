//! The request model consumed by the dispatcher.
//!
//! A [`Request`] is an ordered list of named sources, each holding ordered
//! `(name, value)` pairs, plus an optional request path. Transports build one
//! per inbound call; the dispatcher never looks at anything else.
//!
//! # Example
//!
//! ```rust,ignore
//! use objgate_core::Request;
//!
//! let request = Request::new()
//!     .query_string("attr=calc.compute&x=5")?
//!     .json_body(serde_json::json!({"y": 2}))?
//!     .route_arg("user", "alice");
//! ```

use fancy_regex::Regex;
use serde_json::Value;

use crate::error::{PatternError, RequestError};
use crate::value::kind_name;

/// Source name of the structured request body.
pub const BODY: &str = "body";
/// Source name of the query string.
pub const QUERY: &str = "query";
/// Source name of route parameters.
pub const ROUTE: &str = "route";

/// Default collection order. Later sources override earlier ones.
pub const DEFAULT_SOURCES: [&str; 3] = [BODY, QUERY, ROUTE];

/// A single named source of request data.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    name: String,
    args: Vec<(String, Value)>,
}

impl Source {
    /// Returns the source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `(name, value)` pairs in arrival order.
    pub fn args(&self) -> &[(String, Value)] {
        &self.args
    }

    /// Returns the last value supplied for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Inbound request data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    sources: Vec<Source>,
    path: Option<String>,
}

impl Request {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends pairs to the source `name`, creating it if needed.
    pub fn with_source<I, K>(mut self, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let name = name.into();
        let args = args.into_iter().map(|(k, v)| (k.into(), v));
        match self.sources.iter_mut().find(|s| s.name == name) {
            Some(source) => source.args.extend(args),
            None => self.sources.push(Source {
                name,
                args: args.collect(),
            }),
        }
        self
    }

    /// Adds the pairs of a URL-encoded query string as the `query` source.
    ///
    /// Values are kept as strings; coercion is left to input transforms.
    pub fn query_string(self, query: &str) -> Result<Self, RequestError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query).map_err(|e| RequestError::Query(e.to_string()))?;
        Ok(self.with_source(
            QUERY,
            pairs.into_iter().map(|(k, v)| (k, Value::String(v))),
        ))
    }

    /// Adds the members of a JSON object as the `body` source.
    ///
    /// `null` is treated as an empty body.
    pub fn json_body(self, body: Value) -> Result<Self, RequestError> {
        match body {
            Value::Object(map) => Ok(self.with_source(BODY, map)),
            Value::Null => Ok(self.with_source(BODY, std::iter::empty::<(String, Value)>())),
            other => Err(RequestError::BodyNotObject(kind_name(&other))),
        }
    }

    /// Adds a single route parameter.
    pub fn route_arg(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_source(ROUTE, [(name.into(), value.into())])
    }

    /// Sets the request path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns the source named `name`.
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Returns all sources in insertion order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Returns the request path, if any.
    pub fn request_path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

// =============================================================================
// Attribute Location
// =============================================================================

/// Where the attribute path of a request is found.
#[derive(Debug, Clone)]
pub enum AttrLocator {
    /// A named argument, looked up in the given sources; the first hit wins.
    Argument {
        /// Argument name.
        name: String,
        /// Sources to search, in order.
        sources: Vec<String>,
    },
    /// Capture group 1 of a pattern matched against the request path.
    PathPattern(Regex),
}

impl Default for AttrLocator {
    fn default() -> Self {
        Self::argument("attr")
    }
}

impl AttrLocator {
    /// Locates the attribute through argument `name` in `route`, then `query`.
    pub fn argument(name: impl Into<String>) -> Self {
        Self::Argument {
            name: name.into(),
            sources: vec![ROUTE.to_string(), QUERY.to_string()],
        }
    }

    /// Locates the attribute in the request path.
    pub fn path_pattern(pattern: &str) -> Result<Self, PatternError> {
        Regex::new(pattern)
            .map(Self::PathPattern)
            .map_err(|e| PatternError::Invalid {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns the argument name carrying the attribute, if any.
    pub fn argument_name(&self) -> Option<&str> {
        match self {
            Self::Argument { name, .. } => Some(name),
            Self::PathPattern(_) => None,
        }
    }

    /// Extracts the attribute path from `request`.
    ///
    /// Empty and non-string values count as absent.
    pub fn locate(&self, request: &Request) -> Option<String> {
        match self {
            Self::Argument { name, sources } => sources
                .iter()
                .filter_map(|source| request.source(source))
                .filter_map(|source| source.get(name))
                .find_map(|value| value.as_str().filter(|s| !s.is_empty()))
                .map(str::to_string),
            Self::PathPattern(regex) => {
                let path = request.request_path()?;
                let captures = regex.captures(path).ok().flatten()?;
                captures
                    .get(1)
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string_values_are_strings() {
        let request = Request::new().query_string("?attr=greet&x=5&name=a%20b").unwrap();
        let query = request.source(QUERY).unwrap();
        assert_eq!(query.get("x"), Some(&json!("5")));
        assert_eq!(query.get("name"), Some(&json!("a b")));
    }

    #[test]
    fn test_repeated_key_keeps_last() {
        let request = Request::new().query_string("x=1&x=2").unwrap();
        assert_eq!(request.source(QUERY).unwrap().get("x"), Some(&json!("2")));
        assert_eq!(request.source(QUERY).unwrap().args().len(), 2);
    }

    #[test]
    fn test_json_body_must_be_object() {
        let err = Request::new().json_body(json!([1, 2])).unwrap_err();
        assert!(matches!(err, RequestError::BodyNotObject("array")));

        let request = Request::new().json_body(Value::Null).unwrap();
        assert!(request.source(BODY).unwrap().args().is_empty());
    }

    #[test]
    fn test_sources_merge_by_name() {
        let request = Request::new().route_arg("a", 1).route_arg("b", "two");
        assert_eq!(request.sources().len(), 1);
        assert_eq!(request.source(ROUTE).unwrap().get("b"), Some(&json!("two")));
    }

    #[test]
    fn test_locator_prefers_route() {
        let request = Request::new()
            .query_string("attr=from_query")
            .unwrap()
            .route_arg("attr", "from_route");
        assert_eq!(
            AttrLocator::default().locate(&request).as_deref(),
            Some("from_route")
        );
    }

    #[test]
    fn test_locator_ignores_empty_and_non_string() {
        let request = Request::new().route_arg("attr", 3).query_string("attr=").unwrap();
        assert!(AttrLocator::default().locate(&request).is_none());
    }

    #[test]
    fn test_locator_path_pattern() {
        let locator = AttrLocator::path_pattern(r"^/api/([\w.]+)$").unwrap();
        let request = Request::new().path("/api/fcalc.compute");
        assert_eq!(locator.locate(&request).as_deref(), Some("fcalc.compute"));
        assert!(locator.locate(&Request::new().path("/other")).is_none());
        assert!(locator.argument_name().is_none());
    }
}
