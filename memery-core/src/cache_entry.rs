use std::time::{Duration, Instant};

use crate::monotonic_clock;

/// One cached invocation outcome.
///
/// Each memoized result is wrapped in a `CacheEntry` which records the
/// monotonic time at which the result was produced. The timestamp is what TTL
/// checks are made against.
///
/// # Type Parameters
///
/// * `R` - The type of the cached result
///
/// # Fields
///
/// * `result` - The value returned by the original method
/// * `time` - The monotonic time at which `result` was stored
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use memery_core::CacheEntry;
///
/// let entry = CacheEntry::new(42);
/// assert_eq!(entry.result, 42);
///
/// // A fresh entry is within a 60 second TTL
/// assert!(!entry.is_expired(Some(Duration::from_secs(60))));
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<R> {
    pub result: R,
    pub time: Instant,
}

impl<R> CacheEntry<R> {
    /// Creates a new entry stamped with the current monotonic time.
    pub fn new(result: R) -> Self {
        Self::at(result, monotonic_clock())
    }

    /// Creates an entry stamped with the given time.
    pub fn at(result: R, time: Instant) -> Self {
        Self { result, time }
    }

    /// Returns true if the entry may be served at `now`.
    ///
    /// An entry is fresh when no TTL is configured or when
    /// `now <= time + ttl`. The boundary itself still counts as fresh.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use memery_core::CacheEntry;
    ///
    /// let entry = CacheEntry::new("data");
    /// let ttl = Duration::from_millis(50);
    ///
    /// assert!(entry.is_fresh(Some(ttl), entry.time + ttl));
    /// assert!(!entry.is_fresh(Some(ttl), entry.time + ttl + Duration::from_nanos(1)));
    /// assert!(entry.is_fresh(None, entry.time + Duration::from_secs(3600)));
    /// ```
    pub fn is_fresh(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            None => true,
            // A deadline past the end of the clock's range never expires.
            Some(ttl) => self.time.checked_add(ttl).map_or(true, |deadline| now <= deadline),
        }
    }

    /// Returns true if the entry is stale according to `ttl` right now.
    ///
    /// # Arguments
    ///
    /// * `ttl` - Optional time-to-live. `None` means the entry never expires.
    ///
    /// # Examples
    ///
    /// ```
    /// use memery_core::CacheEntry;
    /// use std::thread;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::new("data");
    /// thread::sleep(Duration::from_millis(20));
    ///
    /// assert!(entry.is_expired(Some(Duration::from_millis(10))));
    /// assert!(!entry.is_expired(None));
    /// ```
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        !self.is_fresh(ttl, monotonic_clock())
    }
}
