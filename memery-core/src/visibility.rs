use std::fmt;

use crate::{Memoizable, MemoizeError, TypeDef};

/// Accessibility level of a method.
///
/// Memoizing a method never changes its visibility: the wrapper is installed
/// at exactly the level the original had.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Callable only from within the instance itself.
    Private,
    /// Callable from instances of the same type.
    Protected,
    /// Callable from anywhere.
    Public,
}

/// Who is making a call, for the purpose of visibility checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Receiver {
    /// A call on an explicit receiver from outside the type.
    Explicit,
    /// A call made from another instance of the same type.
    SameType,
    /// A call the instance makes on itself.
    Implicit,
}

impl Visibility {
    /// Returns true if a method with this visibility may be called by `receiver`.
    ///
    /// # Examples
    ///
    /// ```
    /// use memery_core::{Receiver, Visibility};
    ///
    /// assert!(Visibility::Public.is_callable_by(Receiver::Explicit));
    /// assert!(!Visibility::Protected.is_callable_by(Receiver::Explicit));
    /// assert!(Visibility::Protected.is_callable_by(Receiver::SameType));
    /// assert!(!Visibility::Private.is_callable_by(Receiver::SameType));
    /// assert!(Visibility::Private.is_callable_by(Receiver::Implicit));
    /// ```
    pub fn is_callable_by(self, receiver: Receiver) -> bool {
        match self {
            Visibility::Public => true,
            Visibility::Protected => receiver != Receiver::Explicit,
            Visibility::Private => receiver == Receiver::Implicit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a method of `def` as private, protected or public.
///
/// Fails with [`MemoizeError::UndefinedMethod`] if the method is not defined
/// at any visibility.
///
/// # Examples
///
/// ```
/// use memery_core::{method_visibility, MemeryCache, Memoizable, TypeDef, Visibility};
///
/// #[derive(Default)]
/// struct Report {
///     cache: MemeryCache,
/// }
///
/// impl Memoizable for Report {
///     fn memery_cache(&self) -> &MemeryCache {
///         &self.cache
///     }
/// }
///
/// let mut report = TypeDef::<Report>::new("Report");
/// report.define("rows", Visibility::Protected, |_this: &Report, (): ()| 10u32);
///
/// assert_eq!(method_visibility(&report, "rows"), Ok(Visibility::Protected));
/// assert!(method_visibility(&report, "columns").is_err());
/// ```
pub fn method_visibility<T>(def: &TypeDef<T>, name: &str) -> Result<Visibility, MemoizeError>
where
    T: Memoizable + 'static,
{
    if def.private_method_defined(name) {
        Ok(Visibility::Private)
    } else if def.protected_method_defined(name) {
        Ok(Visibility::Protected)
    } else if def.public_method_defined(name) {
        Ok(Visibility::Public)
    } else {
        Err(MemoizeError::undefined(name, def.name()))
    }
}
