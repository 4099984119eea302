use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, FnArg, Ident, ImplItem, ImplItemFn,
    ItemImpl, Pat, Type,
};

// Import shared utilities
use memery_macro_utils::{
    borrows_inside, generate_bypass_expr, generate_key_expr, generate_key_part, is_option_type,
    parse_memery_attributes, parse_memoize_attributes, visibility_tokens, MemoizeAttributes,
};

/// A method selected for memoization, with the arguments it was declared with
struct Declared {
    name: Ident,
    attrs: MemoizeAttributes,
}

/// A typed parameter of a memoized method
struct Param {
    ident: Ident,
    ty: Type,
    block: bool,
}

fn is_attribute(attr: &Attribute, name: &str) -> bool {
    attr.path().is_ident(name)
}

/// Removes the `#[memoize]` attribute from `method`, returning its arguments
fn take_memoize_attribute(method: &mut ImplItemFn) -> syn::Result<Option<MemoizeAttributes>> {
    let mut found = None;
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attr in method.attrs.drain(..) {
        if !is_attribute(&attr, "memoize") {
            kept.push(attr);
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new_spanned(
                attr,
                format!("{} is already memoized", method.sig.ident),
            ));
        }
        let parsed = match &attr.meta {
            syn::Meta::Path(_) => MemoizeAttributes::default(),
            syn::Meta::List(list) => parse_memoize_attributes(list.tokens.clone())?,
            syn::Meta::NameValue(_) => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "expected `#[memoize]` or `#[memoize(ttl = .., condition = ..)]`",
                ))
            }
        };
        found = Some(parsed);
    }

    method.attrs = kept;
    Ok(found)
}

/// Checks the signature and collects the typed parameters
fn collect_params(method: &mut ImplItemFn) -> syn::Result<Vec<Param>> {
    let sig = &mut method.sig;

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "async methods cannot be memoized",
        ));
    }
    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "const methods cannot be memoized",
        ));
    }
    if let Some(param) = sig
        .generics
        .params
        .iter()
        .find(|param| !matches!(param, syn::GenericParam::Lifetime(_)))
    {
        return Err(syn::Error::new_spanned(
            param,
            "methods with type or const parameters cannot be memoized",
        ));
    }

    let mut has_receiver = false;
    let mut params = Vec::new();

    for arg in sig.inputs.iter_mut() {
        match arg {
            FnArg::Receiver(receiver) => {
                let shared = matches!(
                    &*receiver.ty,
                    Type::Reference(reference) if reference.mutability.is_none()
                );
                if !shared {
                    return Err(syn::Error::new_spanned(
                        receiver,
                        "memoized methods must take `&self`",
                    ));
                }
                has_receiver = true;
            }
            FnArg::Typed(pat_type) => {
                let before = pat_type.attrs.len();
                pat_type.attrs.retain(|attr| !is_attribute(attr, "block"));
                let block = pat_type.attrs.len() != before;

                let ident = match &*pat_type.pat {
                    Pat::Ident(pat_ident) if pat_ident.by_ref.is_none() && pat_ident.subpat.is_none() => {
                        pat_ident.ident.clone()
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "memoized methods take plain identifier parameters",
                        ))
                    }
                };
                if block && !is_option_type(&pat_type.ty) {
                    return Err(syn::Error::new_spanned(
                        &pat_type.ty,
                        "a #[block] parameter must be an `Option<_>`",
                    ));
                }
                if !block && borrows_inside(&pat_type.ty) {
                    let ty = &pat_type.ty;
                    return Err(syn::Error::new_spanned(
                        ty,
                        format!(
                            "memoized arguments must be owned or a plain reference; `{}` borrows inside",
                            quote!(#ty)
                        ),
                    ));
                }

                params.push(Param {
                    ident,
                    ty: (*pat_type.ty).clone(),
                    block,
                });
            }
        }
    }

    if !has_receiver {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "memoized methods must take `&self`",
        ));
    }

    Ok(params)
}

/// Generate the hidden original and the memoizing wrapper for `method`
fn generate_memoized_method(
    mut method: ImplItemFn,
    attrs: &MemoizeAttributes,
) -> syn::Result<(TokenStream2, TokenStream2)> {
    let params = collect_params(&mut method)?;

    let name = method.sig.ident.clone();
    let name_str = name.to_string();
    let original_ident = format_ident!("__memery_original_{}", name);

    let (docs, other_attrs): (Vec<Attribute>, Vec<Attribute>) = method
        .attrs
        .iter()
        .cloned()
        .partition(|attr| is_attribute(attr, "doc"));

    let mut original_sig = method.sig.clone();
    original_sig.ident = original_ident.clone();
    let original_block = &method.block;
    let original = quote! {
        #[doc(hidden)]
        #( #other_attrs )*
        #original_sig #original_block
    };

    let mut wrapper_sig = method.sig.clone();
    for arg in wrapper_sig.inputs.iter_mut() {
        if let FnArg::Typed(pat_type) = arg {
            if let Pat::Ident(pat_ident) = &mut *pat_type.pat {
                pat_ident.mutability = None;
            }
        }
    }

    let call_args: Vec<&Ident> = params.iter().map(|param| &param.ident).collect();
    let blocks: Vec<Ident> = params
        .iter()
        .filter(|param| param.block)
        .map(|param| param.ident.clone())
        .collect();
    let key_parts: Vec<TokenStream2> = params
        .iter()
        .filter(|param| !param.block)
        .map(|param| generate_key_part(&param.ident, &param.ty))
        .collect();

    let bypass = generate_bypass_expr(&blocks, attrs.condition.as_ref());
    let key_expr = generate_key_expr(&key_parts);
    let ttl_expr = attrs.ttl_expr();
    let vis = &method.vis;

    let wrapper = quote! {
        #( #docs )*
        #( #other_attrs )*
        #vis #wrapper_sig {
            if #bypass {
                return self.#original_ident( #( #call_args ),* );
            }
            let __memery_method = match <Self as ::memery::MemoizedMethods>::memoized_methods().get(#name_str) {
                ::std::option::Option::Some(__memery_method) => __memery_method.key(),
                ::std::option::Option::None => return self.#original_ident( #( #call_args ),* ),
            };
            ::memery::Memoizable::memery_cache(self).fetch(
                __memery_method,
                #key_expr,
                #ttl_expr,
                move || self.#original_ident( #( #call_args ),* ),
            )
        }
    };

    Ok((original, wrapper))
}

fn expand_memery(attr: TokenStream2, mut input: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[memery] applies to inherent impl blocks, not trait impls",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[memery] does not support generic impl blocks",
        ));
    }

    let self_ty = input.self_ty.clone();
    let type_name = quote!(#self_ty).to_string().replace(' ', "");

    let mut declared: Vec<Declared> = parse_memery_attributes(attr)?
        .into_iter()
        .map(|declaration| Declared {
            name: declaration.name,
            attrs: declaration.attrs,
        })
        .collect();

    // Methods annotated with #[memoize]
    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            if let Some(attrs) = take_memoize_attribute(method)? {
                declared.push(Declared {
                    name: method.sig.ident.clone(),
                    attrs,
                });
            }
        }
    }

    for (index, declaration) in declared.iter().enumerate() {
        if declared[..index]
            .iter()
            .any(|earlier| earlier.name == declaration.name)
        {
            return Err(syn::Error::new_spanned(
                &declaration.name,
                format!("{} is already memoized", declaration.name),
            ));
        }
    }

    let mut items = Vec::with_capacity(input.items.len() + declared.len());
    let mut registrations = Vec::with_capacity(declared.len());
    let mut remaining: Vec<&Declared> = declared.iter().collect();

    for item in input.items.drain(..) {
        let method = match item {
            ImplItem::Fn(method) => method,
            other => {
                items.push(quote! { #other });
                continue;
            }
        };

        let Some(position) = remaining
            .iter()
            .position(|declaration| declaration.name == method.sig.ident)
        else {
            items.push(quote! { #method });
            continue;
        };
        let declaration = remaining.swap_remove(position);

        let name_str = method.sig.ident.to_string();
        let visibility = visibility_tokens(&method.vis);
        let ttl = declaration.attrs.ttl_expr();
        let conditional = declaration.attrs.condition.is_some();
        registrations.push(quote! {
            __memery_registry.register(
                #name_str,
                ::memery::MemoizedMethod::new(#name_str, #visibility)
                    .with_ttl(#ttl)
                    .with_condition(#conditional),
            );
        });

        let (original, wrapper) = generate_memoized_method(method, &declaration.attrs)?;
        items.push(original);
        items.push(wrapper);
    }

    if let Some(missing) = remaining.first() {
        return Err(syn::Error::new_spanned(
            &missing.name,
            format!("Method {} is not defined on {}", missing.name, type_name),
        ));
    }

    let attrs = &input.attrs;
    let unsafety = &input.unsafety;
    let impl_token = &input.impl_token;

    Ok(quote! {
        #( #attrs )*
        #unsafety #impl_token #self_ty {
            #( #items )*
        }

        impl ::memery::MemoizedMethods for #self_ty {
            fn memoized_methods() -> &'static ::memery::MethodRegistry<::memery::MemoizedMethod> {
                static REGISTRY: ::memery::__private::Lazy<::memery::MethodRegistry<::memery::MemoizedMethod>> =
                    ::memery::__private::Lazy::new(|| {
                        let mut __memery_registry = ::memery::MethodRegistry::new(#type_name);
                        #( #registrations )*
                        __memery_registry
                    });
                &REGISTRY
            }
        }
    })
}

/// An attribute macro that memoizes methods of an inherent `impl` block.
///
/// Every selected method is replaced by a wrapper with the same name,
/// signature and visibility. The wrapper stores results in the receiver's
/// [`MemeryCache`](../memery/struct.MemeryCache.html), keyed by the method and
/// the exact arguments of the call. The original body stays reachable only
/// through the wrapper.
///
/// Methods are selected either with `#[memoize]` on the method or with a
/// list on the block itself:
///
/// ```ignore
/// #[memery(memoize(total), memoize(rates, ttl = 60))]
/// impl Invoice { /* ... */ }
/// ```
///
/// The type must implement `Memoizable` (usually through
/// `#[derive(Memoizable)]`). The block also implements `MemoizedMethods` for
/// the type, so `Invoice::is_memoized("total")` answers whether a method is
/// memoized.
///
/// # Requirements
///
/// - **Receiver**: memoized methods take `&self`
/// - **Arguments**: plain identifiers; their owned forms must implement
///   `Hash + Eq + Send + 'static` (references are keyed through `ToOwned`)
/// - **Borrowed arguments**: only a top-level `&T` is converted to an owned
///   key. Types that borrow further down, such as `Option<&str>`,
///   `Vec<&str>` or `(&str, u8)`, are rejected; take `Option<String>` or
///   `&[String]` instead
/// - **Return type**: must implement `Clone + Send + 'static`
/// - **Generics**: neither the block nor the methods may have type or const
///   parameters
/// - **One block per type**: `#[memery]` implements `MemoizedMethods` for the
///   type, so a second `#[memery]` block on the same type fails with
///   "conflicting implementations of trait `MemoizedMethods`". Put every
///   memoized method of a type in a single block; plain impl blocks are fine
///
/// # Memoize Parameters
///
/// - `ttl` (optional): Time-to-live in seconds, integer or float. Entries
///   older than this are recomputed on their next access. Default: none.
/// - `condition` (optional): An expression callable as `Fn(&Self) -> bool`.
///   When it returns false the call bypasses the cache entirely.
///
/// A parameter marked `#[block]` must be an `Option<_>`. Passing `Some`
/// bypasses the cache, and the parameter is never part of the key.
///
/// # Examples
///
/// ```ignore
/// use memery::{memery, Memoizable, MemeryCache};
///
/// #[derive(Default, Memoizable)]
/// struct Report {
///     cache: MemeryCache,
///     online: bool,
/// }
///
/// #[memery]
/// impl Report {
///     #[memoize]
///     pub fn total(&self, year: u32) -> u64 {
///         expensive_sum(year)
///     }
///
///     #[memoize(ttl = 0.5, condition = Self::is_online)]
///     pub fn rates(&self, currency: &str) -> Vec<f64> {
///         fetch_rates(currency)
///     }
///
///     #[memoize]
///     fn transform(&self, x: i32, #[block] f: Option<fn(i32) -> i32>) -> i32 {
///         f.map_or(x * 2, |f| f(x))
///     }
///
///     fn is_online(&self) -> bool {
///         self.online
///     }
/// }
/// ```
///
/// # Concurrency
///
/// The cache is never locked while the original body runs, so memoized
/// methods may call each other. Two threads calling with the same arguments
/// at once may both compute the result; the later one is kept.
#[proc_macro_attribute]
pub fn memery(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);

    match expand_memery(attr.into(), input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

/// Marks a method for memoization inside a `#[memery]` impl block.
///
/// Accepts `ttl` and `condition`, see [`macro@memery`]. Used anywhere else it
/// is a compile error.
#[proc_macro_attribute]
pub fn memoize(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = TokenStream2::from(item);
    let error = syn::Error::new(
        proc_macro2::Span::call_site(),
        "#[memoize] must be used on a method inside a #[memery] impl block",
    )
    .to_compile_error();

    TokenStream::from(quote! {
        #error
        #item
    })
}

/// Derives `Memoizable` by pointing it at the struct's `MemeryCache` field.
///
/// The field is the one marked `#[memery_cache]`, or else the one whose type
/// is named `MemeryCache`.
///
/// ```ignore
/// #[derive(Default, Memoizable)]
/// struct Client {
///     #[memery_cache]
///     results: memery::MemeryCache,
///     name: String,
/// }
/// ```
#[proc_macro_derive(Memoizable, attributes(memery_cache))]
pub fn derive_memoizable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_memoizable(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn is_memery_cache_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "MemeryCache"),
        _ => false,
    }
}

fn expand_memoizable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Memoizable can only be derived for structs",
            ))
        }
    };

    let members: Vec<(syn::Member, &syn::Field)> = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|field| {
                field
                    .ident
                    .clone()
                    .map(|ident| (syn::Member::Named(ident), field))
            })
            .collect(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(index, field)| (syn::Member::Unnamed(index.into()), field))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let marked = members
        .iter()
        .find(|(_, field)| field.attrs.iter().any(|attr| is_attribute(attr, "memery_cache")));
    let member = match marked.or_else(|| members.iter().find(|(_, field)| is_memery_cache_type(&field.ty))) {
        Some((member, _)) => member,
        None => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Memoizable needs a `MemeryCache` field; mark it with #[memery_cache]",
            ))
        }
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::memery::Memoizable for #ident #ty_generics #where_clause {
            fn memery_cache(&self) -> &::memery::MemeryCache {
                &self.#member
            }
        }
    })
}
