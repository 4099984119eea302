use std::time::Instant;

/// Returns the current reading of the monotonic clock.
///
/// Timestamps come from [`Instant`], so they never go backwards and are not
/// affected by adjustments of the system wall clock. They are only compared
/// against each other for TTL checks and are never persisted.
///
/// # Examples
///
/// ```
/// use memery_core::monotonic_clock;
///
/// let earlier = monotonic_clock();
/// let later = monotonic_clock();
/// assert!(later >= earlier);
/// ```
pub fn monotonic_clock() -> Instant {
    Instant::now()
}
