//! Attribute permission matching.
//!
//! An [`AttributeSpec`] describes which dotted attribute paths may be
//! accessed. It is compiled once into an [`AttributeMatcher`], a single
//! start-anchored pattern of the form
//!
//! ```text
//! ^(?!(?:exclude|...))(?:include|...)
//! ```
//!
//! # Normalization
//!
//! - An include not ending in `*` must match the complete path (`$` is
//!   appended unless already present).
//! - An include ending in a wildcard (`a.b.*`, `a.b\.*`, `a.b*`) on a dotted
//!   path literal permits the path itself and all of its descendants. On any
//!   other pattern the wildcard collapses to `.*`.
//! - Excludes follow the same wildcard rule, but without an explicit `$` or
//!   wildcard they exclude the path and all of its descendants.
//!
//! An empty spec permits nothing.

use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PatternError;

/// A description of the permissible attribute paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    /// Include-only list of paths or patterns.
    List(Vec<String>),
    /// A single pattern used as-is.
    Pattern(String),
    /// Include and exclude pattern sets.
    Rules {
        /// Patterns to include.
        #[serde(default)]
        include: Vec<String>,
        /// Patterns to exclude.
        #[serde(default)]
        exclude: Vec<String>,
    },
}

impl Default for AttributeSpec {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl AttributeSpec {
    /// Creates an include-only spec.
    pub fn list<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(paths.into_iter().map(Into::into).collect())
    }

    /// Creates an include/exclude spec.
    pub fn rules<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self::Rules {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the effective pattern source, or `None` if nothing is permitted.
    pub fn effective_pattern(&self) -> Option<String> {
        match self {
            Self::Pattern(pattern) if pattern.is_empty() => None,
            Self::Pattern(pattern) => Some(format!("^(?:{pattern})")),
            Self::List(include) => combine(include, &[]),
            Self::Rules { include, exclude } => combine(include, exclude),
        }
    }
}

fn combine(include: &[String], exclude: &[String]) -> Option<String> {
    let include = alternation(include, normalize_include)?;
    match alternation(exclude, normalize_exclude) {
        Some(exclude) => Some(format!("^(?!{exclude}){include}")),
        None => Some(format!("^{include}")),
    }
}

fn alternation(patterns: &[String], normalize: fn(&str) -> String) -> Option<String> {
    let parts: Vec<String> = patterns
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| format!("(?:{})", normalize(p)))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("(?:{})", parts.join("|")))
    }
}

/// Splits a trailing wildcard off `pattern`, returning the prefix.
fn strip_wildcard(pattern: &str) -> Option<&str> {
    if !pattern.ends_with('*') {
        return None;
    }
    pattern
        .strip_suffix(r"\.*")
        .or_else(|| pattern.strip_suffix(".*"))
        .or_else(|| pattern.strip_suffix('*'))
}

/// A dotted path literal: identifier characters and (optionally escaped) dots.
fn is_path_literal(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next() != Some('.') {
                    return false;
                }
            }
            '.' | '_' => {}
            c if c.is_alphanumeric() => {}
            _ => return false,
        }
    }
    !prefix.is_empty()
}

fn wildcard(prefix: &str) -> String {
    if is_path_literal(prefix) {
        format!(r"{prefix}(?:\..*)?$")
    } else {
        format!("{prefix}.*")
    }
}

fn normalize_include(pattern: &str) -> String {
    match strip_wildcard(pattern) {
        Some(prefix) => wildcard(prefix),
        None if pattern.ends_with('$') => pattern.to_string(),
        None => format!("{pattern}$"),
    }
}

fn normalize_exclude(pattern: &str) -> String {
    match strip_wildcard(pattern) {
        Some(prefix) => wildcard(prefix),
        None if pattern.ends_with('$') => pattern.to_string(),
        None => wildcard(pattern),
    }
}

/// An explicitly owned cache of compiled patterns.
///
/// Matchers compiled through the same cache share compiled patterns.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Mutex<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled form of `source`, compiling it on first use.
    pub fn compile(&self, source: &str) -> Result<Arc<Regex>, PatternError> {
        if let Some(regex) = self.compiled.lock().get(source) {
            return Ok(Arc::clone(regex));
        }

        let regex = Regex::new(source).map_err(|e| PatternError::Invalid {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        let regex = Arc::new(regex);
        self.compiled
            .lock()
            .insert(source.to_string(), Arc::clone(&regex));
        Ok(regex)
    }

    /// Returns the number of cached patterns.
    pub fn len(&self) -> usize {
        self.compiled.lock().len()
    }

    /// Returns `true` if no pattern is cached.
    pub fn is_empty(&self) -> bool {
        self.compiled.lock().is_empty()
    }
}

/// A custom permission predicate.
pub type PermitFn = dyn Fn(&str) -> bool + Send + Sync;

#[derive(Clone)]
enum Gate {
    Closed,
    Pattern(Arc<Regex>),
    Predicate(Arc<PermitFn>),
}

/// A compiled attribute permission predicate.
///
/// # Example
///
/// ```rust,ignore
/// let matcher = AttributeMatcher::compile(&AttributeSpec::rules(["a.*"], ["a.b"]))?;
/// assert!(matcher.permits("a.c"));
/// assert!(!matcher.permits("a.b"));
/// ```
#[derive(Clone)]
pub struct AttributeMatcher {
    gate: Gate,
}

impl Default for AttributeMatcher {
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AttributeMatcher {
    /// Compiles `spec` with a private pattern cache.
    pub fn compile(spec: &AttributeSpec) -> Result<Self, PatternError> {
        Self::compile_with(spec, &PatternCache::new())
    }

    /// Compiles `spec`, reusing patterns from `cache`.
    pub fn compile_with(spec: &AttributeSpec, cache: &PatternCache) -> Result<Self, PatternError> {
        let gate = match spec.effective_pattern() {
            Some(source) => Gate::Pattern(cache.compile(&source)?),
            None => Gate::Closed,
        };
        Ok(Self { gate })
    }

    /// A matcher that rejects every path.
    pub fn deny_all() -> Self {
        Self { gate: Gate::Closed }
    }

    /// A matcher backed by a custom predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            gate: Gate::Predicate(Arc::new(predicate)),
        }
    }

    /// Returns `true` if `path` may be accessed.
    pub fn permits(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        match &self.gate {
            Gate::Closed => false,
            Gate::Predicate(predicate) => predicate(path),
            Gate::Pattern(regex) => regex.is_match(path).unwrap_or_else(|e| {
                warn!(path, error = %e, "Attribute pattern failed to run, denying access");
                false
            }),
        }
    }

    /// Returns the effective pattern, if this matcher is pattern based.
    pub fn pattern(&self) -> Option<&str> {
        match &self.gate {
            Gate::Pattern(regex) => Some(regex.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AttributeMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.gate {
            Gate::Closed => f.write_str("AttributeMatcher(closed)"),
            Gate::Pattern(regex) => write!(f, "AttributeMatcher({})", regex.as_str()),
            Gate::Predicate(_) => f.write_str("AttributeMatcher(<fn>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(spec: AttributeSpec) -> AttributeMatcher {
        AttributeMatcher::compile(&spec).unwrap()
    }

    #[test]
    fn test_empty_spec_permits_nothing() {
        let specs = [
            AttributeSpec::default(),
            AttributeSpec::Pattern(String::new()),
            AttributeSpec::rules(Vec::<String>::new(), ["a"]),
            AttributeSpec::list([""]),
        ];
        for spec in specs {
            let m = matcher(spec);
            for path in ["a", "a.b", "greet", "_private", "0"] {
                assert!(!m.permits(path), "{m:?} permitted {path}");
            }
        }
    }

    #[test]
    fn test_exact_entries_are_anchored() {
        let m = matcher(AttributeSpec::list(["a.b"]));
        assert!(m.permits("a.b"));
        assert!(!m.permits("a.b.c"));
        assert!(!m.permits("a"));
    }

    #[test]
    fn test_wildcard_permits_path_and_descendants() {
        let m = matcher(AttributeSpec::list(["a.b.*"]));
        assert!(m.permits("a.b"));
        assert!(m.permits("a.b.c"));
        assert!(m.permits("a.b.c.d"));
        assert!(!m.permits("a.bc"));
        assert!(!m.permits("a"));
    }

    #[test]
    fn test_accidental_wildcards_collapse() {
        for pattern in [r"a.b\.*", "a.b*"] {
            let m = matcher(AttributeSpec::list([pattern]));
            assert!(m.permits("a.b"), "{pattern}");
            assert!(m.permits("a.b.c"), "{pattern}");
        }
    }

    #[test]
    fn test_exclude_takes_precedence() {
        let m = matcher(AttributeSpec::rules(["a.*"], ["a.b"]));
        assert!(!m.permits("a.b"));
        assert!(!m.permits("a.b.c"));
        assert!(m.permits("a.c"));
        assert!(m.permits("a"));
    }

    #[test]
    fn test_anchored_exclude_only_blocks_exact_path() {
        let m = matcher(AttributeSpec::rules(["a.*"], ["a.b$"]));
        assert!(!m.permits("a.b"));
        assert!(m.permits("a.b.c"));
    }

    #[test]
    fn test_single_pattern_used_as_is() {
        let m = matcher(AttributeSpec::Pattern("[^_].*".into()));
        assert!(m.permits("greet"));
        assert!(m.permits("fcalc.compute"));
        assert!(!m.permits("_private"));
    }

    #[test]
    fn test_regex_include_with_wildcard_keeps_meaning() {
        let m = matcher(AttributeSpec::list(["[^_].*"]));
        assert!(m.permits("greet"));
        assert!(!m.permits("_hidden"));
    }

    #[test]
    fn test_multiple_includes() {
        let m = matcher(AttributeSpec::list([
            "greet",
            "fcalc.compute",
            "fcalc.whoami",
            "icalc.compute",
        ]));
        assert!(m.permits("greet"));
        assert!(m.permits("icalc.compute"));
        assert!(!m.permits("icalc.whoami"));
        assert!(!m.permits("do_not_give_access_to_this"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = AttributeMatcher::compile(&AttributeSpec::Pattern("(".into())).unwrap_err();
        assert!(matches!(err, PatternError::Invalid { .. }));
    }

    #[test]
    fn test_pattern_cache_shares_compiled_patterns() {
        let cache = PatternCache::new();
        let spec = AttributeSpec::list(["greet"]);
        let a = AttributeMatcher::compile_with(&spec, &cache).unwrap();
        let b = AttributeMatcher::compile_with(&spec, &cache).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(a.pattern(), b.pattern());
    }

    #[test]
    fn test_deserialize_spec_forms() {
        let list: AttributeSpec = serde_json::from_str(r#"["a", "b.*"]"#).unwrap();
        assert_eq!(list, AttributeSpec::list(["a", "b.*"]));

        let pattern: AttributeSpec = serde_json::from_str(r#""[^_].*""#).unwrap();
        assert_eq!(pattern, AttributeSpec::Pattern("[^_].*".into()));

        let rules: AttributeSpec = serde_json::from_str(r#"{"include": ["a.*"]}"#).unwrap();
        assert_eq!(rules, AttributeSpec::rules(["a.*"], Vec::<String>::new()));
    }

    #[test]
    fn test_custom_predicate() {
        let m = AttributeMatcher::from_fn(|path| path.starts_with("public."));
        assert!(m.permits("public.x"));
        assert!(!m.permits("private.x"));
        assert!(m.pattern().is_none());
    }
}
