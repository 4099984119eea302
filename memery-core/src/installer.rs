//! Attaching memery to types, directly or through modules.
//!
//! A type adopts the facility by including the [`Memery`] mixin. A [`Module`]
//! that includes [`Memery`] passes it on: every type (or module) that later
//! includes that module gets memery installed as well, however long the
//! chain of modules is.
//!
//! ```
//! use memery_core::{Memery, MemeryCache, Memoizable, Module, TypeDef};
//!
//! #[derive(Default)]
//! struct Account {
//!     cache: MemeryCache,
//! }
//!
//! impl Memoizable for Account {
//!     fn memery_cache(&self) -> &MemeryCache {
//!         &self.cache
//!     }
//! }
//!
//! let mut cached = Module::new("Cached");
//! cached.include(&Memery);
//!
//! let mut account = TypeDef::<Account>::new("Account");
//! account.include(&cached);
//!
//! assert!(account.has_memery());
//! assert_eq!(account.ancestors(), ["Cached", "Memery"]);
//! ```
//!
//! A module can also carry methods of its own, memoized or not. Including it
//! copies them into the target, where the target's own definitions win.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{MemeryCache, Memoizable, TypeDef};

/// Hook run when a module is included somewhere.
type IncludedHook = Arc<dyn Fn(&mut dyn Includer) + Send + Sync>;

/// Something mixins can be included into.
pub trait Includer {
    fn name(&self) -> &str;

    /// Attaches memery. Calling it again has no further effect.
    fn install_memery(&mut self);

    /// Returns true once memery is attached.
    fn has_memery(&self) -> bool;

    /// Records `name` among the included mixins.
    fn push_ancestor(&mut self, name: &str);

    /// Gives mixins access to the concrete target, to copy methods into it.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A unit of behavior that can be included into an [`Includer`].
pub trait Mixin {
    fn name(&self) -> &str;

    /// Runs the inclusion side effects on `target`.
    fn included_in(&self, target: &mut dyn Includer);
}

/// The memery mixin itself.
///
/// Including it into a type definition attaches the memoization engine to
/// the type and `clear_memery_cache` to its instances. Including it into a
/// [`Module`] makes the module propagate it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Memery;

impl Mixin for Memery {
    fn name(&self) -> &str {
        "Memery"
    }

    fn included_in(&self, target: &mut dyn Includer) {
        target.install_memery();
    }
}

/// Receiver type of modules that only bundle hooks and mixins.
///
/// It has no values, so methods defined on a `Module<Untyped>` can never run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Untyped {}

impl Memoizable for Untyped {
    fn memery_cache(&self) -> &MemeryCache {
        match *self {}
    }
}

/// A composable bundle of behavior that can be included into types and
/// other modules.
///
/// `Module::new` builds a module of hooks and mixins. [`Module::typed`]
/// builds one that also defines (and memoizes) methods for receivers of
/// type `T`; those methods are copied into every `TypeDef<T>` or
/// `Module<T>` that includes it.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use memery_core::{Memery, Module};
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
///
/// let mut audited = Module::new("Audited");
/// audited.on_included(move |_target| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
/// audited.include(&Memery);
///
/// let mut reporting = Module::new("Reporting");
/// reporting.include(&audited);
///
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// assert!(reporting.propagates_memery());
/// ```
///
/// Memoizing in a module:
///
/// ```
/// use memery_core::{Memery, MemeryCache, Memoizable, MemoizeOptions, Module, Receiver, TypeDef, Visibility};
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
/// let mut totals = Module::<Report>::typed("Totals");
/// totals.include(&Memery);
/// totals
///     .methods_mut()
///     .define("total", Visibility::Public, |_: &Report, (n,): (u64,)| (1..=n).sum::<u64>());
/// totals
///     .methods_mut()
///     .memoizer()
///     .unwrap()
///     .memoize("total", MemoizeOptions::new())
///     .unwrap();
///
/// let mut report = TypeDef::<Report>::new("Report");
/// report.include(&totals);
/// assert!(report.is_memoized("total"));
///
/// let instance = Report::default();
/// let total = report.method::<(u64,), u64>("total", Receiver::Explicit).unwrap();
/// assert_eq!(total.call(&instance, (4,)), 10);
/// assert_eq!(instance.memery_cache().len(), 1);
/// ```
pub struct Module<T = Untyped> {
    methods: TypeDef<T>,
    hooks: Vec<IncludedHook>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self::typed(name)
    }
}

impl<T: Memoizable + 'static> Module<T> {
    /// Creates a module whose methods take receivers of type `T`.
    pub fn typed(name: impl Into<String>) -> Self {
        Self {
            methods: TypeDef::new(name),
            hooks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.methods.name()
    }

    /// Registers a hook that runs on every target this module is included into.
    ///
    /// Hooks run in registration order, before memery is propagated.
    pub fn on_included<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut dyn Includer) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Includes `mixin` into this module.
    pub fn include(&mut self, mixin: &dyn Mixin) -> &mut Self {
        self.methods.include(mixin);
        self
    }

    /// The methods this module defines.
    pub fn methods(&self) -> &TypeDef<T> {
        &self.methods
    }

    /// Mutable access to the module's methods, to define and memoize them.
    pub fn methods_mut(&mut self) -> &mut TypeDef<T> {
        &mut self.methods
    }

    /// Returns true if including this module installs memery on the target.
    pub fn propagates_memery(&self) -> bool {
        self.methods.has_memery()
    }

    /// Names of every mixin included directly or through other modules.
    pub fn ancestors(&self) -> &[String] {
        self.methods.ancestors()
    }

    fn defines_methods(&self) -> bool {
        self.methods
            .method_names()
            .into_iter()
            .any(|name| name != "clear_memery_cache")
    }
}

impl<T: Memoizable + 'static> Mixin for Module<T> {
    fn name(&self) -> &str {
        self.methods.name()
    }

    fn included_in(&self, target: &mut dyn Includer) {
        for ancestor in self.ancestors() {
            target.push_ancestor(ancestor);
        }
        for hook in &self.hooks {
            hook(&mut *target);
        }
        if self.propagates_memery() {
            log::debug!("{} propagates memery to {}", self.name(), target.name());
            target.install_memery();
        }
        if self.defines_methods() {
            let target_name = target.name().to_string();
            match target.as_any_mut().downcast_mut::<TypeDef<T>>() {
                Some(def) => def.adopt(&self.methods),
                None => log::warn!(
                    "{} defines methods for another receiver type, none copied into {target_name}",
                    self.name()
                ),
            }
        }
    }
}

impl<T: Memoizable + 'static> fmt::Debug for Module<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name())
            .field("hooks", &self.hooks.len())
            .field("memery", &self.propagates_memery())
            .field("ancestors", &self.ancestors())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemeryCache, Memoizable, MemoizeOptions, Receiver, TypeDef, Visibility};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Widget {
        cache: MemeryCache,
        renders: AtomicUsize,
    }

    impl Memoizable for Widget {
        fn memery_cache(&self) -> &MemeryCache {
            &self.cache
        }
    }

    fn widget_type() -> TypeDef<Widget> {
        let mut def = TypeDef::new("Widget");
        def.define("render", Visibility::Public, |this: &Widget, (): ()| {
            this.renders.fetch_add(1, Ordering::SeqCst);
            String::from("<widget>")
        });
        def
    }

    #[test]
    fn test_direct_inclusion() {
        let mut def = widget_type();
        assert!(!def.has_memery());

        def.include(&Memery);
        assert!(def.has_memery());
        assert!(def.includes("Memery"));
        assert!(def.method::<(), ()>("clear_memery_cache", Receiver::Explicit).is_some());
    }

    #[test]
    fn test_double_installation_is_a_no_op() {
        let mut def = widget_type();
        def.include(&Memery);
        def.memoizer()
            .unwrap()
            .memoize("render", MemoizeOptions::new())
            .unwrap();

        def.include(&Memery);
        assert!(def.is_memoized("render"));
        assert_eq!(def.ancestors(), ["Memery"]);
    }

    #[test]
    fn test_module_propagates_to_type() {
        let mut cached = Module::new("Cached");
        assert!(!cached.propagates_memery());
        cached.include(&Memery);
        assert!(cached.propagates_memery());

        let mut def = widget_type();
        def.include(&cached);

        assert!(def.has_memery());
        def.memoizer()
            .unwrap()
            .memoize("render", MemoizeOptions::new())
            .unwrap();

        let widget = Widget::default();
        let render = def.method::<(), String>("render", Receiver::Explicit).unwrap();
        render.call(&widget, ());
        render.call(&widget, ());
        assert_eq!(widget.renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_module_without_memery_does_not_install() {
        let plain = Module::new("Plain");
        let mut def = widget_type();
        def.include(&plain);

        assert!(!def.has_memery());
        assert!(def.memoizer().is_none());
        assert_eq!(def.ancestors(), ["Plain"]);
    }

    #[test]
    fn test_chain_through_nested_modules() {
        let mut inner = Module::new("Inner");
        inner.include(&Memery);

        let mut outer = Module::new("Outer");
        outer.include(&inner);
        assert!(outer.propagates_memery());

        let mut def = widget_type();
        def.include(&outer);

        assert!(def.has_memery());
        assert_eq!(def.ancestors(), ["Outer", "Inner", "Memery"]);
    }

    #[test]
    fn test_hooks_run_before_memery_is_installed() {
        let observed = Arc::new(AtomicUsize::new(0));
        let installed_when_hook_ran = Arc::new(AtomicUsize::new(0));

        let mut concern = Module::new("Concern");
        {
            let observed = Arc::clone(&observed);
            let installed = Arc::clone(&installed_when_hook_ran);
            concern.on_included(move |target| {
                observed.fetch_add(1, Ordering::SeqCst);
                if target.has_memery() {
                    installed.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        concern.include(&Memery);

        let mut first = widget_type();
        first.include(&concern);
        let mut second = widget_type();
        second.include(&concern);

        assert_eq!(observed.load(Ordering::SeqCst), 2);
        assert_eq!(installed_when_hook_ran.load(Ordering::SeqCst), 0);
        assert!(first.has_memery());
        assert!(second.has_memery());
    }

    #[test]
    fn test_memery_before_module_hooks_order_independent() {
        let mut concern = Module::new("Concern");
        concern.include(&Memery);
        concern.on_included(|_| {});

        let mut def = widget_type();
        def.include(&concern);
        assert!(def.has_memery());
    }

    fn ledger_module() -> Module<Widget> {
        let mut ledger = Module::typed("Ledger");
        ledger.include(&Memery);
        let methods = ledger.methods_mut();
        methods.define("summary", Visibility::Public, |this: &Widget, (n,): (u32,)| {
            this.renders.fetch_add(1, Ordering::SeqCst);
            format!("summary-{n}")
        });
        methods.define("render", Visibility::Public, |_: &Widget, (): ()| {
            String::from("<ledger>")
        });
        methods
            .memoizer()
            .unwrap()
            .memoize("summary", MemoizeOptions::new())
            .unwrap();
        ledger
    }

    #[test]
    fn test_module_methods_are_copied_memoized() {
        let ledger = ledger_module();
        assert!(ledger.methods().is_memoized("summary"));

        let mut def = widget_type();
        def.include(&ledger);

        assert!(def.has_memery());
        assert!(def.is_memoized("summary"));
        assert_eq!(def.method_names(), ["clear_memery_cache", "render", "summary"]);

        let widget = Widget::default();
        let summary = def.method::<(u32,), String>("summary", Receiver::Explicit).unwrap();
        assert_eq!(summary.call(&widget, (2,)), "summary-2");
        assert_eq!(summary.call(&widget, (2,)), "summary-2");
        assert_eq!(widget.renders.load(Ordering::SeqCst), 1);
        assert_eq!(widget.memery_cache().len(), 1);

        let clear = def.method::<(), ()>("clear_memery_cache", Receiver::Explicit).unwrap();
        clear.call(&widget, ());
        summary.call(&widget, (2,));
        assert_eq!(widget.renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_own_definition_wins_over_module() {
        let mut def = widget_type();
        def.include(&ledger_module());

        let widget = Widget::default();
        let render = def.method::<(), String>("render", Receiver::Explicit).unwrap();
        assert_eq!(render.call(&widget, ()), "<widget>");
        assert!(!def.is_memoized("render"));
    }

    #[test]
    fn test_module_methods_pass_through_modules() {
        let mut outer = Module::<Widget>::typed("Outer");
        outer.include(&ledger_module());
        assert!(outer.methods().is_memoized("summary"));

        let mut def = widget_type();
        def.include(&outer);
        assert_eq!(def.ancestors(), ["Outer", "Ledger", "Memery"]);
        assert!(def.is_memoized("summary"));
    }

    #[test]
    fn test_module_for_other_receiver_copies_nothing() {
        struct Other {
            cache: MemeryCache,
        }

        impl Memoizable for Other {
            fn memery_cache(&self) -> &MemeryCache {
                &self.cache
            }
        }

        let mut foreign = Module::<Other>::typed("Foreign");
        foreign
            .methods_mut()
            .define("name", Visibility::Public, |_: &Other, (): ()| 1u8);

        let mut def = widget_type();
        def.include(&foreign);
        assert_eq!(def.ancestors(), ["Foreign"]);
        assert!(!def.public_method_defined("name"));
    }

    #[test]
    fn test_debug() {
        let mut module = Module::new("Cached");
        module.include(&Memery);
        assert_eq!(
            format!("{module:?}"),
            r#"Module { name: "Cached", hooks: 0, memery: true, ancestors: ["Memery"] }"#
        );
    }
}
