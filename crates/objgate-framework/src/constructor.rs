//! Root objects and the constructor cache.
//!
//! A [`Root`] is either a constant object or a constructor called with the
//! [`CtorArgs`] popped out of each request. Constructed roots are kept in a
//! bounded LRU [`ConstructorCache`], so identical constructor arguments reuse
//! the same object.
//!
//! # Locking
//!
//! Lookup-and-promote and insert-and-evict each run under the cache lock.
//! Construction itself runs outside the lock; two callers missing on the same
//! key may both construct, and the last insert wins.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::object::{Exposed, SharedObject};
use objgate_core::CallResult;

/// Default number of cached root objects.
pub const DEFAULT_CACHE_SIZE: usize = 20;

// =============================================================================
// Constructor Arguments
// =============================================================================

/// Arguments for constructing a root object.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CtorArgs {
    /// Named arguments.
    Named(Map<String, Value>),
    /// Positional arguments.
    Positional(Vec<Value>),
    /// A single positional argument.
    Single(Value),
    /// No arguments.
    #[default]
    Absent,
}

impl CtorArgs {
    /// Named arguments, or [`CtorArgs::Absent`] when `args` is empty.
    pub fn named(args: Map<String, Value>) -> Self {
        if args.is_empty() {
            Self::Absent
        } else {
            Self::Named(args)
        }
    }

    /// Returns a named argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Named(args) => args.get(name),
            _ => None,
        }
    }

    /// Returns a positional argument; a single argument is at index 0.
    pub fn at(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Positional(args) => args.get(index),
            Self::Single(value) if index == 0 => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if no arguments were given.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Canonical rendering used as the cache key.
    ///
    /// Object keys are rendered in sorted order at every depth, so equal
    /// arguments produce equal keys regardless of arrival order.
    pub fn cache_key(&self) -> String {
        let mut key = String::new();
        match self {
            Self::Named(args) => {
                key.push_str("named:");
                write_canonical_object(args, &mut key);
            }
            Self::Positional(args) => {
                key.push_str("positional:");
                write_canonical_array(args, &mut key);
            }
            Self::Single(value) => {
                key.push_str("single:");
                write_canonical(value, &mut key);
            }
            Self::Absent => key.push_str("absent"),
        }
        key
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(items) => write_canonical_array(items, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_canonical_object(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (name, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::from(name.as_str()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}

fn write_canonical_array(items: &[Value], out: &mut String) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_canonical(item, out);
    }
    out.push(']');
}

// =============================================================================
// Root
// =============================================================================

/// The function behind [`Root::constructor`].
pub type ConstructFn = dyn Fn(&CtorArgs) -> CallResult<SharedObject> + Send + Sync;

/// The object dispatch starts from.
#[derive(Clone)]
pub enum Root {
    /// A constant object; constructor arguments are ignored.
    Constant(SharedObject),
    /// A constructor called per distinct set of arguments.
    Constructor(Arc<ConstructFn>),
}

impl Root {
    /// A constant root object.
    pub fn constant(object: impl Exposed + 'static) -> Self {
        Self::Constant(Arc::new(object))
    }

    /// A constructed root object.
    pub fn constructor<F>(construct: F) -> Self
    where
        F: Fn(&CtorArgs) -> CallResult<SharedObject> + Send + Sync + 'static,
    {
        Self::Constructor(Arc::new(construct))
    }

    /// Returns `true` for constant roots.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Produces the root object for `args`, consulting `cache` for constructors.
    pub fn resolve(&self, args: &CtorArgs, cache: &ConstructorCache) -> CallResult<SharedObject> {
        match self {
            Self::Constant(object) => Ok(Arc::clone(object)),
            Self::Constructor(construct) => cache.get_or_construct(args, |args| construct(args)),
        }
    }
}

impl From<SharedObject> for Root {
    fn from(object: SharedObject) -> Self {
        Self::Constant(object)
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(object) => f.debug_tuple("Constant").field(object).finish(),
            Self::Constructor(_) => f.write_str("Constructor(<fn>)"),
        }
    }
}

// =============================================================================
// Constructor Cache
// =============================================================================

/// Called with the key and object of each entry evicted under capacity pressure.
pub type EvictFn = dyn Fn(&str, &SharedObject) + Send + Sync;

/// Hit and miss counters of a [`ConstructorCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that constructed a new object.
    pub misses: u64,
    /// Current number of entries.
    pub len: usize,
    /// Maximum number of entries; zero when disabled.
    pub capacity: usize,
}

/// A bounded LRU cache of constructed root objects.
pub struct ConstructorCache {
    entries: Option<Mutex<LruCache<String, SharedObject>>>,
    on_evict: Option<Arc<EvictFn>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ConstructorCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl ConstructorCache {
    /// Creates a cache holding up to `capacity` objects. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            on_evict: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Sets a listener called for each evicted entry.
    pub fn on_evict<F>(mut self, listener: F) -> Self
    where
        F: Fn(&str, &SharedObject) + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(listener));
        self
    }

    /// Returns the cached object for `args`, constructing it on a miss.
    pub fn get_or_construct<F>(&self, args: &CtorArgs, construct: F) -> CallResult<SharedObject>
    where
        F: FnOnce(&CtorArgs) -> CallResult<SharedObject>,
    {
        let Some(entries) = &self.entries else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return construct(args);
        };

        let key = args.cache_key();
        if let Some(object) = entries.lock().get(&key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Constructor cache hit");
            return Ok(object);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Constructing root object");
        let object = construct(args)?;

        let displaced = entries.lock().push(key.clone(), Arc::clone(&object));
        if let Some((evicted_key, evicted)) = displaced {
            // `push` also returns the old value when replacing the same key.
            if evicted_key != key {
                debug!(key = %evicted_key, "Evicted root object");
                if let Some(listener) = &self.on_evict {
                    listener(&evicted_key, &evicted);
                }
            }
        }

        Ok(object)
    }

    /// Returns `true` if an object for `args` is cached, without promoting it.
    pub fn contains(&self, args: &CtorArgs) -> bool {
        self.entries
            .as_ref()
            .is_some_and(|entries| entries.lock().contains(&args.cache_key()))
    }

    /// Removes all entries. Cleared entries are not reported as evicted.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    /// Returns the number of cached objects.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the capacity; zero when caching is disabled.
    pub fn capacity(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |entries| entries.lock().cap().get())
    }

    /// Returns hit and miss statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
            capacity: self.capacity(),
        }
    }
}

impl std::fmt::Debug for ConstructorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorCache")
            .field("stats", &self.stats())
            .finish()
    }
}
