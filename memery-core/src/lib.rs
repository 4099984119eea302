//! # Memery Core
//!
//! Runtime building blocks for the memery memoization library.
//!
//! Memoization in memery is per instance: every object that adopts the
//! facility owns a [`MemeryCache`], and each memoized method stores its results
//! there, keyed by the method's identity and the exact arguments it was called
//! with.
//!
//! ## Features
//!
//! - **Per-instance caches**: no cache is shared between objects or types
//! - **TTL support**: entries older than the configured time-to-live are recomputed
//! - **Conditional caching**: a per-call predicate can bypass the cache
//! - **Block bypass**: calls that pass a block never touch the cache
//! - **Visibility preservation**: the wrapper keeps the method's visibility
//! - **Mixin propagation**: modules that include [`Memery`] pass it on
//!
//! ## Module Organization
//!
//! - [`cache_entry`] - Cached result with its monotonic timestamp
//! - [`clock`] - Monotonic clock used for TTL comparisons
//! - [`installer`] - The [`Memery`] mixin, [`Module`] and the inclusion traits
//! - [`registry`] - Per-type registry of memoized methods
//! - [`store`] - The per-instance [`MemeryCache`] and the [`Memoizable`] trait
//! - [`type_def`] - Runtime method tables and the [`Memoizer`] engine
//! - [`visibility`] - Method visibility and the three-way classifier
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use memery_core::{Memery, MemeryCache, Memoizable, MemoizeOptions, Receiver, TypeDef, Visibility};
//!
//! #[derive(Default)]
//! struct Calculator {
//!     cache: MemeryCache,
//! }
//!
//! impl Memoizable for Calculator {
//!     fn memery_cache(&self) -> &MemeryCache {
//!         &self.cache
//!     }
//! }
//!
//! let mut calculator = TypeDef::<Calculator>::new("Calculator");
//! calculator.include(&Memery);
//! calculator.define("double", Visibility::Public, |_this: &Calculator, (x,): (i32,)| x * 2);
//!
//! calculator
//!     .memoizer()
//!     .expect("memery is installed")
//!     .memoize("double", MemoizeOptions::new().ttl(Duration::from_secs(60)))
//!     .unwrap();
//!
//! let instance = Calculator::default();
//! let double = calculator.method::<(i32,), i32>("double", Receiver::Explicit).unwrap();
//! assert_eq!(double.call(&instance, (3,)), 6);
//! assert_eq!(instance.memery_cache().len(), 1);
//! ```
pub mod cache_entry;
pub mod clock;
mod error;
pub mod installer;
mod method_key;
mod options;
pub mod registry;
pub mod store;
pub mod type_def;
pub mod visibility;

pub use cache_entry::CacheEntry;
pub use clock::monotonic_clock;
pub use error::MemoizeError;
pub use installer::{Includer, Memery, Mixin, Module, Untyped};
pub use method_key::{MethodId, MethodKey};
pub use options::MemoizeOptions;
pub use registry::{MemoizedMethod, MemoizedMethods, MethodRegistry};
pub use store::{MemeryCache, Memoizable};
pub use type_def::{Method, MethodDef, Memoizer, NoBlock, TypeDef};
pub use visibility::{method_visibility, Receiver, Visibility};

/// Items used by code generated from the `memery` macros.
#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;

    /// Evaluates a `condition = ..` argument against the receiver.
    ///
    /// Passing the condition through a generic bound lets closures written
    /// without parameter types infer `&T`.
    #[inline]
    pub fn condition_holds<T: ?Sized, F>(this: &T, condition: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        condition(this)
    }
}
