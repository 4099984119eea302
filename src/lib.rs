//! # Memery
//!
//! Per-instance memoization of methods.
//!
//! Memoizing a method replaces it with a wrapper of the same name, signature
//! and visibility that remembers results per instance, keyed by the exact
//! arguments. A cached result can expire after a time-to-live, a per-call
//! condition can bypass the cache, and a call that passes a block never
//! touches it.
//!
//! ## Features
//!
//! - **Per-instance caches**: each object owns its [`MemeryCache`]
//! - **TTL support**: stale entries are recomputed lazily on their next access
//! - **Conditional caching**: `condition` decides per call whether to use the cache
//! - **Block bypass**: a `#[block]` argument of `Some(..)` skips the cache
//! - **Visibility preservation**: wrappers keep the original visibility
//! - **Mixin propagation**: [`Module`]s that include [`Memery`] pass it on
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use memery::{memery, MemeryCache, Memoizable, MemoizedMethods};
//!
//! #[derive(Default, Memoizable)]
//! struct Calculator {
//!     cache: MemeryCache,
//!     calls: AtomicU32,
//! }
//!
//! #[memery]
//! impl Calculator {
//!     #[memoize]
//!     pub fn double(&self, x: i32) -> i32 {
//!         self.calls.fetch_add(1, Ordering::SeqCst);
//!         x * 2
//!     }
//! }
//!
//! let calculator = Calculator::default();
//! assert_eq!(calculator.double(3), 6);
//! assert_eq!(calculator.double(3), 6);
//! assert_eq!(calculator.calls.load(Ordering::SeqCst), 1);
//!
//! assert!(Calculator::is_memoized("double"));
//! calculator.clear_memery_cache();
//! assert_eq!(calculator.double(3), 6);
//! assert_eq!(calculator.calls.load(Ordering::SeqCst), 2);
//! ```
//!
//! ## TTL and Conditions
//!
//! ```rust
//! use memery::{memery, MemeryCache, Memoizable};
//!
//! #[derive(Default, Memoizable)]
//! struct Rates {
//!     cache: MemeryCache,
//!     online: bool,
//! }
//!
//! #[memery(memoize(quote, ttl = 60, condition = Self::is_online))]
//! impl Rates {
//!     pub fn quote(&self, currency: &str) -> f64 {
//!         if currency == "EUR" { 1.08 } else { 1.0 }
//!     }
//!
//!     fn is_online(&self) -> bool {
//!         self.online
//!     }
//! }
//!
//! let offline = Rates::default();
//! offline.quote("EUR");
//! assert!(offline.memery_cache().is_empty());
//! ```
//!
//! ## Runtime Definitions
//!
//! Types whose methods are assembled at runtime use [`TypeDef`]; the
//! [`Memoizer`] returned by [`TypeDef::memoizer`] reports undefined methods as
//! [`MemoizeError::UndefinedMethod`].
//!
//! ```rust
//! use memery::{Memery, MemeryCache, Memoizable, MemoizeOptions, TypeDef};
//!
//! #[derive(Default, Memoizable)]
//! struct Report {
//!     cache: MemeryCache,
//! }
//!
//! let mut report = TypeDef::<Report>::new("Report");
//! report.include(&Memery);
//!
//! let err = report
//!     .memoizer()
//!     .unwrap()
//!     .memoize("total", MemoizeOptions::new())
//!     .unwrap_err();
//! assert_eq!(err.to_string(), "Method total is not defined on Report");
//! ```
//!
//! ## Limitations
//!
//! A type takes a single `#[memery]` block. A second one repeats the
//! `MemoizedMethods` impl and fails with a conflicting implementations error:
//!
//! ```compile_fail
//! use memery::{memery, MemeryCache, Memoizable};
//!
//! #[derive(Default, Memoizable)]
//! struct Split {
//!     cache: MemeryCache,
//! }
//!
//! #[memery]
//! impl Split {
//!     #[memoize]
//!     pub fn left(&self) -> u8 { 1 }
//! }
//!
//! #[memery]
//! impl Split {
//!     #[memoize]
//!     pub fn right(&self) -> u8 { 2 }
//! }
//! ```
//!
//! Only a top-level reference is turned into an owned key. Arguments that
//! borrow further down, such as `Option<&str>`, are rejected:
//!
//! ```compile_fail
//! use memery::{memery, MemeryCache, Memoizable};
//!
//! #[derive(Default, Memoizable)]
//! struct Greeter {
//!     cache: MemeryCache,
//! }
//!
//! #[memery]
//! impl Greeter {
//!     #[memoize]
//!     pub fn greet(&self, name: Option<&str>) -> String {
//!         format!("hello {}", name.unwrap_or("you"))
//!     }
//! }
//! ```

pub use memery_core::*;
pub use memery_macros::{memery, memoize, Memoizable};

/// Version of the memery crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
