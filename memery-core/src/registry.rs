use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::{MethodId, MethodKey, Visibility};

/// Per-type registry of memoized methods.
///
/// Maps each memoized method name to what was captured when it was memoized.
/// For runtime definitions that is the original [`MethodDef`]; for types
/// expanded by `#[memery]` it is a [`MemoizedMethod`] describing the original.
/// A name appears at most once. Names are reported in registration order.
///
/// [`MethodDef`]: crate::MethodDef
///
/// # Examples
///
/// ```
/// use memery_core::{MemoizedMethod, MethodRegistry, Visibility};
///
/// let mut registry = MethodRegistry::new("Invoice");
/// registry.register("total", MemoizedMethod::new("total", Visibility::Public));
///
/// assert!(registry.contains("total"));
/// assert!(!registry.contains("tax"));
/// assert_eq!(registry.names().collect::<Vec<_>>(), vec!["total"]);
/// ```
pub struct MethodRegistry<M> {
    type_name: String,
    methods: HashMap<&'static str, M>,
    order: Vec<&'static str>,
}

impl<M> MethodRegistry<M> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Name of the type owning this registry.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Records `method` under `name`, returning what was recorded before.
    pub fn register(&mut self, name: &'static str, method: M) -> Option<M> {
        let previous = self.methods.insert(name, method);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    /// Forgets `name`, returning what was recorded for it.
    pub fn remove(&mut self, name: &str) -> Option<M> {
        let removed = self.methods.remove(name);
        if removed.is_some() {
            self.order.retain(|registered| *registered != name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&M> {
        self.methods.get(name)
    }

    /// Returns true if `name` has been memoized on this type.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Memoized method names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &M)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.methods.get(name).map(|method| (*name, method)))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<M> fmt::Debug for MethodRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("type_name", &self.type_name)
            .field("methods", &self.order)
            .finish()
    }
}

/// Description of a method memoized by the `#[memery]` macro.
///
/// Built once per method when the type's registry is first accessed. The
/// `key` carries the identity the instance caches use for this method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoizedMethod {
    key: MethodKey,
    visibility: Visibility,
    ttl: Option<Duration>,
    conditional: bool,
}

impl MemoizedMethod {
    pub fn new(name: &'static str, visibility: Visibility) -> Self {
        Self {
            key: MethodKey::new(name, MethodId::next()),
            visibility,
            ttl: None,
            conditional: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_condition(mut self, conditional: bool) -> Self {
        self.conditional = conditional;
        self
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    pub fn key(&self) -> MethodKey {
        self.key
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Whether caching depends on a per-call condition.
    pub fn is_conditional(&self) -> bool {
        self.conditional
    }
}

/// Type-level memoization queries.
///
/// Implemented by the `#[memery]` attribute for the type of the annotated
/// `impl` block.
pub trait MemoizedMethods {
    /// The registry of methods memoized on this type.
    fn memoized_methods() -> &'static MethodRegistry<MemoizedMethod>;

    /// Returns true if `name` is memoized on this type.
    fn is_memoized(name: &str) -> bool {
        Self::memoized_methods().contains(name)
    }
}
