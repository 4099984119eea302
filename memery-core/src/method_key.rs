use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_METHOD_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of one method implementation.
///
/// Ids are handed out from a process-wide counter when an implementation is
/// defined, so two definitions never share an id, even under the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u64);

impl MethodId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_METHOD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// First-level key of an instance cache: a method name paired with the
/// identity of the original body it wraps.
///
/// # Examples
///
/// ```
/// use memery_core::{MethodId, MethodKey};
///
/// let key = MethodKey::new("total", MethodId::next());
/// let other = MethodKey::new("total", MethodId::next());
///
/// assert_eq!(key.name(), "total");
/// assert_ne!(key, other);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodKey {
    name: &'static str,
    id: MethodId,
}

impl MethodKey {
    pub fn new(name: &'static str, id: MethodId) -> Self {
        Self { name, id }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> MethodId {
        self.id
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}
