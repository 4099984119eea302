use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding, per call, whether the cache may be used.
pub(crate) type Condition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Configuration of one `memoize` call.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use memery_core::MemoizeOptions;
///
/// struct Client {
///     online: bool,
/// }
///
/// let options = MemoizeOptions::<Client>::new()
///     .ttl(Duration::from_secs(30))
///     .condition(|client: &Client| client.online);
///
/// assert_eq!(options.ttl_value(), Some(Duration::from_secs(30)));
/// assert!(options.has_condition());
/// ```
pub struct MemoizeOptions<T> {
    pub(crate) condition: Option<Condition<T>>,
    pub(crate) ttl: Option<Duration>,
}

impl<T> MemoizeOptions<T> {
    /// No condition and no TTL: results are cached until the instance's
    /// cache is cleared.
    pub fn new() -> Self {
        Self {
            condition: None,
            ttl: None,
        }
    }

    /// Entries older than `ttl` are recomputed on their next access.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Caching is bypassed for calls on instances where `condition` is false.
    ///
    /// The condition is evaluated on every call, before any cache lookup.
    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn ttl_value(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// Returns true if a call on `this` should skip the cache.
    pub(crate) fn bypasses(&self, this: &T) -> bool {
        self.condition.as_ref().is_some_and(|condition| !condition(this))
    }
}

impl<T> Default for MemoizeOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoizeOptions<T> {
    fn clone(&self) -> Self {
        Self {
            condition: self.condition.clone(),
            ttl: self.ttl,
        }
    }
}

impl<T> fmt::Debug for MemoizeOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizeOptions")
            .field("condition", &self.has_condition())
            .field("ttl", &self.ttl)
            .finish()
    }
}
