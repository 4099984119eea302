use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::{
    method_visibility, Includer, Memoizable, MemoizeError, MemoizeOptions, MethodId, MethodKey,
    MethodRegistry, Mixin, Receiver, Visibility,
};

/// Block type of methods that do not accept a block.
///
/// The type is uninhabited, so such methods can only ever be called without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoBlock {}

type Body<T, A, R, B> = Arc<dyn Fn(&T, A, Option<B>) -> R + Send + Sync>;

type Wrap<T> = Arc<dyn Fn(MethodKey, &MemoizeOptions<T>) -> MethodDef<T> + Send + Sync>;

/// One entry of a runtime method table.
///
/// Holds the implementation type-erased, together with a constructor for its
/// memoizing wrapper, which is built while the concrete argument, result and
/// block types are still known.
pub struct MethodDef<T> {
    name: &'static str,
    id: MethodId,
    visibility: Visibility,
    body: Arc<dyn Any + Send + Sync>,
    wrap: Wrap<T>,
}

impl<T: Memoizable + 'static> MethodDef<T> {
    fn new<A, R, B>(name: &'static str, visibility: Visibility, body: Body<T, A, R, B>) -> Self
    where
        A: Hash + Eq + Clone + Send + 'static,
        R: Clone + Send + 'static,
        B: 'static,
    {
        let original = Arc::clone(&body);
        let wrap: Wrap<T> = Arc::new(move |key: MethodKey, options: &MemoizeOptions<T>| {
            let original = Arc::clone(&original);
            let options = options.clone();
            let wrapper: Body<T, A, R, B> = Arc::new(move |this: &T, args: A, block: Option<B>| {
                if block.is_some() || options.bypasses(this) {
                    return original(this, args, block);
                }
                this.memery_cache()
                    .fetch(key, args.clone(), options.ttl, || original(this, args, None))
            });
            MethodDef::new(name, visibility, wrapper)
        });

        Self {
            name,
            id: MethodId::next(),
            visibility,
            body: Arc::new(body),
            wrap,
        }
    }

    /// Builds the caching wrapper of this implementation.
    ///
    /// Cached entries are keyed by this implementation's identity, so every
    /// wrapper built from the same original shares them.
    fn memoized(&self, options: &MemoizeOptions<T>) -> Self {
        (self.wrap)(self.key(), options)
    }
}

impl<T> MethodDef<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn key(&self) -> MethodKey {
        MethodKey::new(self.name, self.id)
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

impl<T> Clone for MethodDef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            id: self.id,
            visibility: self.visibility,
            body: Arc::clone(&self.body),
            wrap: Arc::clone(&self.wrap),
        }
    }
}

impl<T> fmt::Debug for MethodDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// A callable handle to a method looked up in a [`TypeDef`].
pub struct Method<T, A, R, B = NoBlock> {
    name: &'static str,
    visibility: Visibility,
    body: Body<T, A, R, B>,
}

impl<T, A, R, B> Method<T, A, R, B> {
    /// Calls the method on `this` without a block.
    pub fn call(&self, this: &T, args: A) -> R {
        (self.body)(this, args, None)
    }

    /// Calls the method on `this` with a block. Memoized methods never cache
    /// such calls.
    pub fn call_with_block(&self, this: &T, args: A, block: B) -> R {
        (self.body)(this, args, Some(block))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

impl<T, A, R, B> Clone for Method<T, A, R, B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            visibility: self.visibility,
            body: Arc::clone(&self.body),
        }
    }
}

/// Runtime definition of a type: its method table, its memoization registry
/// once memery is installed, and the mixins it includes.
///
/// Methods take their arguments as a tuple. Argument tuples must be hashable
/// and results clonable, so that any method of the table can be memoized.
///
/// # Examples
///
/// ```
/// use memery_core::{Memery, MemeryCache, Memoizable, MemoizeOptions, Receiver, TypeDef, Visibility};
///
/// #[derive(Default)]
/// struct Greeter {
///     cache: MemeryCache,
/// }
///
/// impl Memoizable for Greeter {
///     fn memery_cache(&self) -> &MemeryCache {
///         &self.cache
///     }
/// }
///
/// let mut greeter = TypeDef::<Greeter>::new("Greeter");
/// greeter.include(&Memery);
/// greeter.define("greet", Visibility::Public, |_this: &Greeter, (name,): (String,)| {
///     format!("Hello, {name}!")
/// });
///
/// let mut memoizer = greeter.memoizer().unwrap();
/// assert_eq!(memoizer.memoize("greet", MemoizeOptions::new()), Ok("greet"));
/// assert!(memoizer.memoize("wave", MemoizeOptions::new()).is_err());
///
/// let instance = Greeter::default();
/// let greet = greeter.method::<(String,), String>("greet", Receiver::Explicit).unwrap();
/// assert_eq!(greet.call(&instance, ("Ada".to_string(),)), "Hello, Ada!");
/// assert!(greeter.is_memoized("greet"));
/// ```
pub struct TypeDef<T> {
    name: String,
    methods: HashMap<&'static str, MethodDef<T>>,
    memoized: Option<MethodRegistry<MethodDef<T>>>,
    ancestors: Vec<String>,
}

impl<T: Memoizable + 'static> TypeDef<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            memoized: None,
            ancestors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defines (or redefines) a method that takes no block.
    ///
    /// Redefining a memoized method replaces the wrapper and removes the name
    /// from the memoization registry.
    pub fn define<A, R, F>(&mut self, name: &'static str, visibility: Visibility, f: F) -> &'static str
    where
        A: Hash + Eq + Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        let body: Body<T, A, R, NoBlock> =
            Arc::new(move |this: &T, args: A, _block: Option<NoBlock>| f(this, args));
        self.insert(MethodDef::new(name, visibility, body))
    }

    /// Defines (or redefines) a method that accepts an optional block of type `B`.
    pub fn define_with_block<A, R, B, F>(
        &mut self,
        name: &'static str,
        visibility: Visibility,
        f: F,
    ) -> &'static str
    where
        A: Hash + Eq + Clone + Send + 'static,
        R: Clone + Send + 'static,
        B: 'static,
        F: Fn(&T, A, Option<B>) -> R + Send + Sync + 'static,
    {
        let body: Body<T, A, R, B> = Arc::new(f);
        self.insert(MethodDef::new(name, visibility, body))
    }

    fn insert(&mut self, def: MethodDef<T>) -> &'static str {
        let name = def.name();
        if let Some(registry) = self.memoized.as_mut() {
            if registry.remove(name).is_some() {
                log::debug!("{}#{name} redefined, memoization dropped", self.name);
            }
        }
        self.methods.insert(name, def);
        name
    }

    /// Changes the visibility of an already defined method.
    pub fn set_visibility(&mut self, name: &str, visibility: Visibility) -> Result<(), MemoizeError> {
        match self.methods.get_mut(name) {
            Some(def) => {
                def.visibility = visibility;
                Ok(())
            }
            None => Err(MemoizeError::undefined(name, &self.name)),
        }
    }

    fn visibility_of(&self, name: &str) -> Option<Visibility> {
        self.methods.get(name).map(MethodDef::visibility)
    }

    pub fn private_method_defined(&self, name: &str) -> bool {
        self.visibility_of(name) == Some(Visibility::Private)
    }

    pub fn protected_method_defined(&self, name: &str) -> bool {
        self.visibility_of(name) == Some(Visibility::Protected)
    }

    pub fn public_method_defined(&self, name: &str) -> bool {
        self.visibility_of(name) == Some(Visibility::Public)
    }

    /// See [`method_visibility`].
    pub fn method_visibility(&self, name: &str) -> Result<Visibility, MemoizeError> {
        method_visibility(self, name)
    }

    /// Looks up a method without a block that `receiver` is allowed to call.
    ///
    /// Returns `None` if the method does not exist, is not visible to
    /// `receiver`, or has a different signature.
    pub fn method<A, R>(&self, name: &str, receiver: Receiver) -> Option<Method<T, A, R>>
    where
        A: 'static,
        R: 'static,
    {
        self.method_with_block::<A, R, NoBlock>(name, receiver)
    }

    /// Looks up a method accepting a block of type `B`.
    pub fn method_with_block<A, R, B>(&self, name: &str, receiver: Receiver) -> Option<Method<T, A, R, B>>
    where
        A: 'static,
        R: 'static,
        B: 'static,
    {
        let def = self
            .methods
            .get(name)
            .filter(|def| def.visibility.is_callable_by(receiver))?;
        let body = def.body.downcast_ref::<Body<T, A, R, B>>()?;

        Some(Method {
            name: def.name,
            visibility: def.visibility,
            body: Arc::clone(body),
        })
    }

    /// Copies in the methods of `source` that this type does not define.
    ///
    /// Definitions already present win. Methods memoized in `source` keep
    /// their original in this type's registry, so they stay memoized under
    /// the same method identity.
    pub(crate) fn adopt(&mut self, source: &TypeDef<T>) {
        for name in source.method_names() {
            if self.methods.contains_key(name) {
                continue;
            }
            let Some(def) = source.methods.get(name) else {
                continue;
            };
            log::debug!("{} adopts {name} from {}", self.name, source.name);
            self.methods.insert(name, def.clone());

            let original = source
                .memoized
                .as_ref()
                .and_then(|registry| registry.get(name));
            if let (Some(registry), Some(original)) = (self.memoized.as_mut(), original) {
                registry.register(name, original.clone());
            }
        }
    }

    /// Names of all defined methods, sorted.
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Returns true once memery has been installed on this type.
    pub fn has_memery(&self) -> bool {
        self.memoized.is_some()
    }

    /// The memoization engine of this type, if memery is installed.
    pub fn memoizer(&mut self) -> Option<Memoizer<'_, T>> {
        let registry = self.memoized.as_mut()?;
        Some(Memoizer {
            type_name: &self.name,
            methods: &mut self.methods,
            registry,
        })
    }

    /// The registry of memoized methods, if memery is installed.
    pub fn memoized_methods(&self) -> Option<&MethodRegistry<MethodDef<T>>> {
        self.memoized.as_ref()
    }

    /// Returns true if `name` has been memoized on this type.
    pub fn is_memoized(&self, name: &str) -> bool {
        self.memoized
            .as_ref()
            .is_some_and(|registry| registry.contains(name))
    }

    /// Includes `mixin` into this type.
    pub fn include(&mut self, mixin: &dyn Mixin) -> &mut Self {
        log::debug!("{} includes {}", self.name, mixin.name());
        self.push_ancestor(mixin.name());
        mixin.included_in(self);
        self
    }

    /// Names of every mixin included directly or through modules.
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn includes(&self, mixin: &str) -> bool {
        self.ancestors.iter().any(|ancestor| ancestor == mixin)
    }
}

impl<T: Memoizable + 'static> Includer for TypeDef<T> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Attaches the engine to the type and `clear_memery_cache` to its instances.
    fn install_memery(&mut self) {
        if self.memoized.is_some() {
            return;
        }

        log::debug!("installing memery on {}", self.name);
        self.memoized = Some(MethodRegistry::new(self.name.clone()));
        self.define("clear_memery_cache", Visibility::Public, |this: &T, (): ()| {
            this.clear_memery_cache()
        });
    }

    fn has_memery(&self) -> bool {
        self.memoized.is_some()
    }

    fn push_ancestor(&mut self, name: &str) {
        if !self.includes(name) {
            self.ancestors.push(name.to_string());
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T> fmt::Debug for TypeDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort_unstable();
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("memoized", &self.memoized)
            .field("ancestors", &self.ancestors)
            .finish()
    }
}

/// The memoization engine of a [`TypeDef`].
///
/// Obtained from [`TypeDef::memoizer`] once memery is installed.
pub struct Memoizer<'a, T> {
    type_name: &'a str,
    methods: &'a mut HashMap<&'static str, MethodDef<T>>,
    registry: &'a mut MethodRegistry<MethodDef<T>>,
}

impl<T: Memoizable + 'static> Memoizer<'_, T> {
    /// Replaces `name` with a caching wrapper and returns the method name.
    ///
    /// The wrapper keeps the method's current visibility. Calls that pass a
    /// block, or for which `options`' condition is false, go straight to the
    /// original body.
    ///
    /// Memoizing a name again wraps the original captured the first time with
    /// the new options; the latest call wins and wrappers never nest.
    ///
    /// # Errors
    ///
    /// [`MemoizeError::UndefinedMethod`] if the type does not define `name`.
    pub fn memoize(&mut self, name: &str, options: MemoizeOptions<T>) -> Result<&'static str, MemoizeError> {
        let current = self
            .methods
            .get(name)
            .ok_or_else(|| MemoizeError::undefined(name, self.type_name))?;
        let visibility = current.visibility();
        let original = match self.registry.get(name) {
            Some(original) => original.clone(),
            None => current.clone(),
        };

        let name = original.name();
        let wrapper = original.memoized(&options).with_visibility(visibility);
        log::debug!(
            "memoizing {}#{name} ({visibility}, ttl: {:?}, conditional: {})",
            self.type_name,
            options.ttl_value(),
            options.has_condition()
        );

        self.registry.register(name, original);
        self.methods.insert(name, wrapper);
        Ok(name)
    }

    pub fn is_memoized(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn memoized_methods(&self) -> &MethodRegistry<MethodDef<T>> {
        self.registry
    }
}
