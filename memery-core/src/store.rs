use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{monotonic_clock, CacheEntry, MethodKey};

/// Results of one memoized method, keyed by argument tuple.
///
/// Stored type-erased in the first level of the store; the concrete type is
/// always `HashMap<A, CacheEntry<R>>` for the method's argument and result
/// types.
trait ArgumentStore: Send {
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<A, R> ArgumentStore for HashMap<A, CacheEntry<R>>
where
    A: Hash + Eq + Send + 'static,
    R: Send + 'static,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-instance storage of memoized results.
///
/// The store is a two-level map: [`MethodKey`] → argument tuple →
/// [`CacheEntry`]. It is created lazily on the first memoized call and
/// dropped together with the instance that owns it.
///
/// # Concurrency
///
/// The map is protected by a mutex that is held only while looking up or
/// storing an entry, never while the original method runs. Two threads calling
/// the same method with the same arguments on the same instance can therefore
/// both miss and both compute the result; the later write wins. In-flight
/// computations are not de-duplicated.
///
/// # Examples
///
/// ```
/// use memery_core::{MemeryCache, MethodId, MethodKey};
///
/// let cache = MemeryCache::new();
/// let key = MethodKey::new("square", MethodId::next());
///
/// let first = cache.fetch(key, (4,), None, || 16);
/// let second = cache.fetch(key, (4,), None, || -> i32 { unreachable!() });
///
/// assert_eq!(first, second);
/// assert_eq!(cache.len(), 1);
///
/// cache.clear();
/// assert!(cache.is_empty());
/// ```
#[derive(Default)]
pub struct MemeryCache {
    values: Mutex<Option<HashMap<MethodKey, Box<dyn ArgumentStore>>>>,
}

impl MemeryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `args`, computing and storing it on a miss.
    ///
    /// An entry is a hit if it exists and is fresh according to `ttl`. On a
    /// miss (absent or expired entry) `compute` runs without the store being
    /// locked and its result replaces whatever was stored under `args`.
    ///
    /// # Arguments
    ///
    /// * `method` - Identity of the memoized method
    /// * `args` - The exact argument tuple of the call
    /// * `ttl` - Optional time-to-live of the entry
    /// * `compute` - Invokes the original method
    pub fn fetch<A, R, F>(&self, method: MethodKey, args: A, ttl: Option<Duration>, compute: F) -> R
    where
        A: Hash + Eq + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce() -> R,
    {
        if let Some(result) = self.lookup::<A, R>(method, &args, ttl) {
            log::trace!("memery hit for {method}");
            return result;
        }

        log::trace!("memery miss for {method}");
        let result = compute();
        self.store(method, args, result.clone());
        result
    }

    /// Returns a clone of the fresh entry stored for `args`, if any.
    pub fn lookup<A, R>(&self, method: MethodKey, args: &A, ttl: Option<Duration>) -> Option<R>
    where
        A: Hash + Eq + Send + 'static,
        R: Clone + Send + 'static,
    {
        let values = self.values.lock();
        let entry = values
            .as_ref()?
            .get(&method)?
            .as_any()
            .downcast_ref::<HashMap<A, CacheEntry<R>>>()?
            .get(args)?;

        if entry.is_fresh(ttl, monotonic_clock()) {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    /// Stores `result` for `args`, stamped with the current monotonic time.
    ///
    /// Any previous entry for the same arguments is overwritten.
    pub fn store<A, R>(&self, method: MethodKey, args: A, result: R)
    where
        A: Hash + Eq + Send + 'static,
        R: Clone + Send + 'static,
    {
        let entry = CacheEntry::new(result);
        let mut values = self.values.lock();
        let methods = values.get_or_insert_with(HashMap::new);
        let slot = methods
            .entry(method)
            .or_insert_with(|| -> Box<dyn ArgumentStore> { Box::new(HashMap::<A, CacheEntry<R>>::new()) });

        match slot.as_any_mut().downcast_mut::<HashMap<A, CacheEntry<R>>>() {
            Some(results) => {
                results.insert(args, entry);
            }
            None => {
                // Same key stored under other types: keep only the latest shape.
                let mut results = HashMap::new();
                results.insert(args, entry);
                *slot = Box::new(results);
            }
        }
    }

    /// Discards every cached result of this instance, expired or not.
    ///
    /// Safe to call when nothing has been cached yet.
    pub fn clear(&self) {
        if self.values.lock().take().is_some() {
            log::trace!("memery cache cleared");
        }
    }

    /// Number of stored entries across all methods, including expired ones.
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .as_ref()
            .map_or(0, |methods| methods.values().map(|results| results.len()).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of methods that have at least one store allocated.
    pub fn method_count(&self) -> usize {
        self.values.lock().as_ref().map_or(0, HashMap::len)
    }
}

impl Clone for MemeryCache {
    /// A clone is a new instance: it starts with an empty cache.
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemeryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemeryCache")
            .field("methods", &self.method_count())
            .field("entries", &self.len())
            .finish()
    }
}

/// Gives an instance access to its memoization store.
///
/// Implement this (or derive it with `#[derive(Memoizable)]`) on every type
/// whose methods are memoized. The provided [`clear_memery_cache`] is the
/// instance-level operation attached by the installer.
///
/// [`clear_memery_cache`]: Memoizable::clear_memery_cache
pub trait Memoizable {
    /// The store owned by this instance.
    fn memery_cache(&self) -> &MemeryCache;

    /// Discards every memoized result of this instance.
    ///
    /// Other instances of the same type keep their caches.
    fn clear_memery_cache(&self) {
        self.memery_cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MethodId;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::thread;

    fn key(name: &'static str) -> MethodKey {
        MethodKey::new(name, MethodId::next())
    }

    #[test]
    fn test_fetch_computes_once() {
        let cache = MemeryCache::new();
        let method = key("double");
        let calls = Cell::new(0);

        let compute = |x: i32| {
            calls.set(calls.get() + 1);
            x * 2
        };

        assert_eq!(cache.fetch(method, (3,), None, || compute(3)), 6);
        assert_eq!(cache.fetch(method, (3,), None, || compute(3)), 6);
        assert_eq!(calls.get(), 1);

        assert_eq!(cache.fetch(method, (4,), None, || compute(4)), 8);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_returns_the_stored_value() {
        let cache = MemeryCache::new();
        let method = key("load");

        let first = cache.fetch(method, (), None, || Arc::new(String::from("payload")));
        let second = cache.fetch(method, (), None, || Arc::new(String::from("other")));

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_methods_are_isolated() {
        let cache = MemeryCache::new();
        let a = key("a");
        let b = key("b");

        cache.fetch(a, (1,), None, || "from a");
        let value = cache.fetch(b, (1,), None, || "from b");

        assert_eq!(value, "from b");
        assert_eq!(cache.method_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_argument_order_is_not_normalized() {
        let cache = MemeryCache::new();
        let method = key("sum");

        cache.fetch(method, (1, 2), None, || 3);
        let calls = Cell::new(0);
        cache.fetch(method, (2, 1), None, || {
            calls.set(1);
            3
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entry_is_overwritten() {
        let cache = MemeryCache::new();
        let method = key("now");
        let ttl = Some(Duration::from_millis(30));

        assert_eq!(cache.fetch(method, (), ttl, || 1), 1);
        assert_eq!(cache.fetch(method, (), ttl, || 2), 1);

        thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.lookup::<(), i32>(method, &(), ttl), None);
        assert_eq!(cache.fetch(method, (), ttl, || 3), 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entries_stay_until_accessed() {
        let cache = MemeryCache::new();
        let method = key("stale");

        cache.store(method, ("x",), 10);
        thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.lookup::<(&str,), i32>(method, &("x",), Some(Duration::from_millis(1))), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cache = MemeryCache::new();
        cache.clear();
        assert!(cache.is_empty());

        cache.store(key("f"), (1u8,), 1u8);
        assert!(!cache.is_empty());

        cache.clear();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.method_count(), 0);
    }

    #[test]
    fn test_clone_starts_empty() {
        let cache = MemeryCache::new();
        cache.store(key("f"), (), 5);

        let cloned = cache.clone();
        assert!(cloned.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compute_may_reenter_the_store() {
        let cache = MemeryCache::new();
        let outer = key("outer");
        let inner = key("inner");

        let value = cache.fetch(outer, (), None, || cache.fetch(inner, (), None, || 20) + 1);

        assert_eq!(value, 21);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_debug_output() {
        let cache = MemeryCache::new();
        cache.store(key("f"), (1,), 1);
        cache.store(key("g"), (1,), 1);
        assert_eq!(format!("{cache:?}"), "MemeryCache { methods: 2, entries: 2 }");
    }
}
