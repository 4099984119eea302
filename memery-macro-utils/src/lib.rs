//! Shared utilities for memery procedural macros
//!
//! This crate provides the attribute parsing and code generation helpers
//! used by `memery-macros`.

use std::time::Duration;

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream, Parser};
use syn::{
    punctuated::Punctuated, Expr, GenericArgument, Ident, Lit, MetaNameValue, PathArguments, Token,
    Type, TypeParamBound,
};

/// Parsed arguments of one memoize declaration
#[derive(Default)]
pub struct MemoizeAttributes {
    /// `Duration` expression, when a ttl was given
    pub ttl: Option<TokenStream2>,
    /// Predicate callable as `Fn(&Self) -> bool`
    pub condition: Option<Expr>,
}

impl MemoizeAttributes {
    /// The `Option<Duration>` expression for generated code
    pub fn ttl_expr(&self) -> TokenStream2 {
        match &self.ttl {
            Some(ttl) => quote! { ::std::option::Option::Some(#ttl) },
            None => quote! { ::std::option::Option::None },
        }
    }
}

/// A `memoize(name, ...)` entry of the block-level `#[memery(...)]` list
pub struct MemoizeDeclaration {
    pub name: Ident,
    pub attrs: MemoizeAttributes,
}

impl Parse for MemoizeDeclaration {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name: Ident = input.parse()?;
        let attrs = if input.is_empty() {
            MemoizeAttributes::default()
        } else {
            input.parse::<Token![,]>()?;
            let args = Punctuated::<MetaNameValue, Token![,]>::parse_terminated(input)?;
            collect_attributes(args)?
        };
        Ok(Self { name, attrs })
    }
}

/// Parse the `ttl` attribute
///
/// Accepts integer or float seconds.
pub fn parse_ttl_attribute(nv: &MetaNameValue) -> syn::Result<TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Int(lit_int) => {
                let secs = lit_int.base10_parse::<u64>()?;
                Ok(quote! { ::std::time::Duration::from_secs(#secs) })
            }
            Lit::Float(lit_float) => {
                let secs = lit_float.base10_parse::<f64>()?;
                // Converted here so an unrepresentable ttl fails the build
                // instead of panicking when the registry is first touched
                let ttl = Duration::try_from_secs_f64(secs).map_err(|_| {
                    syn::Error::new_spanned(lit_float, "`ttl` is out of range for a Duration")
                })?;
                let (secs, nanos) = (ttl.as_secs(), ttl.subsec_nanos());
                Ok(quote! { ::std::time::Duration::new(#secs, #nanos) })
            }
            _ => Err(syn::Error::new_spanned(
                &nv.value,
                "Invalid literal for `ttl`: expected seconds as an integer or float",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &nv.value,
            "Invalid syntax for `ttl`: expected `ttl = <seconds>`",
        )),
    }
}

/// Parse the `condition` attribute
pub fn parse_condition_attribute(nv: &MetaNameValue) -> syn::Result<Expr> {
    match &nv.value {
        Expr::Lit(_) => Err(syn::Error::new_spanned(
            &nv.value,
            "Invalid value for `condition`: expected a path or closure taking `&Self`",
        )),
        value => Ok(value.clone()),
    }
}

fn collect_attributes(
    args: Punctuated<MetaNameValue, Token![,]>,
) -> syn::Result<MemoizeAttributes> {
    let mut attrs = MemoizeAttributes::default();

    for nv in args {
        if nv.path.is_ident("ttl") {
            if attrs.ttl.is_some() {
                return Err(syn::Error::new_spanned(&nv.path, "duplicate `ttl` argument"));
            }
            attrs.ttl = Some(parse_ttl_attribute(&nv)?);
        } else if nv.path.is_ident("condition") {
            if attrs.condition.is_some() {
                return Err(syn::Error::new_spanned(
                    &nv.path,
                    "duplicate `condition` argument",
                ));
            }
            attrs.condition = Some(parse_condition_attribute(&nv)?);
        } else {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "unknown memoize argument: expected `ttl` or `condition`",
            ));
        }
    }

    Ok(attrs)
}

/// Parse the arguments of a method-level `#[memoize(...)]` attribute
pub fn parse_memoize_attributes(attr: TokenStream2) -> syn::Result<MemoizeAttributes> {
    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    collect_attributes(parser.parse2(attr)?)
}

/// Parse the block-level `#[memery(memoize(f), memoize(g, ttl = 60))]` list
pub fn parse_memery_attributes(attr: TokenStream2) -> syn::Result<Vec<MemoizeDeclaration>> {
    let parser = Punctuated::<syn::Meta, Token![,]>::parse_terminated;
    let mut declarations = Vec::new();

    for meta in parser.parse2(attr)? {
        match meta {
            syn::Meta::List(list) if list.path.is_ident("memoize") => {
                declarations.push(list.parse_args::<MemoizeDeclaration>()?);
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `memoize(<method>, ...)`",
                ))
            }
        }
    }

    Ok(declarations)
}

/// Maps a Rust visibility onto the three memery visibilities
///
/// Inherited is private, restricted (`pub(crate)`, `pub(super)`,
/// `pub(in ..)`) is protected and `pub` is public.
pub fn visibility_tokens(vis: &syn::Visibility) -> TokenStream2 {
    match vis {
        syn::Visibility::Public(_) => quote! { ::memery::Visibility::Public },
        syn::Visibility::Restricted(_) => quote! { ::memery::Visibility::Protected },
        syn::Visibility::Inherited => quote! { ::memery::Visibility::Private },
    }
}

/// Generate the owned key part for one parameter
///
/// References are keyed by their owned form, everything else by a clone.
pub fn generate_key_part(ident: &Ident, ty: &Type) -> TokenStream2 {
    match ty {
        Type::Reference(reference) => {
            let elem = &reference.elem;
            quote! { <#elem as ::std::borrow::ToOwned>::to_owned(&*#ident) }
        }
        Type::Group(group) => generate_key_part(ident, &group.elem),
        Type::Paren(paren) => generate_key_part(ident, &paren.elem),
        _ => quote! { ::std::clone::Clone::clone(&#ident) },
    }
}

/// Returns true if the owned key for `ty` would still borrow
///
/// A plain `&T` is keyed by `T::to_owned()`, so only borrows below the top
/// level count: `Option<&str>`, `Vec<&str>`, `(&str, u8)`, `Cow<'a, str>`.
pub fn borrows_inside(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => contains_borrow(&reference.elem),
        Type::Group(group) => borrows_inside(&group.elem),
        Type::Paren(paren) => borrows_inside(&paren.elem),
        _ => contains_borrow(ty),
    }
}

fn contains_borrow(ty: &Type) -> bool {
    match ty {
        Type::Reference(_) => true,
        Type::Group(group) => contains_borrow(&group.elem),
        Type::Paren(paren) => contains_borrow(&paren.elem),
        Type::Array(array) => contains_borrow(&array.elem),
        Type::Slice(slice) => contains_borrow(&slice.elem),
        Type::Tuple(tuple) => tuple.elems.iter().any(contains_borrow),
        Type::Path(type_path) => {
            type_path
                .qself
                .as_ref()
                .is_some_and(|qself| contains_borrow(&qself.ty))
                || type_path.path.segments.iter().any(|segment| {
                    let PathArguments::AngleBracketed(args) = &segment.arguments else {
                        return false;
                    };
                    args.args.iter().any(|arg| match arg {
                        GenericArgument::Lifetime(lifetime) => lifetime.ident != "static",
                        GenericArgument::Type(ty) => contains_borrow(ty),
                        GenericArgument::AssocType(assoc) => contains_borrow(&assoc.ty),
                        _ => false,
                    })
                })
        }
        Type::TraitObject(object) => object.bounds.iter().any(|bound| {
            matches!(bound, TypeParamBound::Lifetime(lifetime) if lifetime.ident != "static")
        }),
        _ => false,
    }
}

/// Generate the argument key tuple
pub fn generate_key_expr(parts: &[TokenStream2]) -> TokenStream2 {
    quote! { ( #( #parts, )* ) }
}

/// Generate the bypass test: any block given, or a condition that fails
pub fn generate_bypass_expr(blocks: &[Ident], condition: Option<&Expr>) -> TokenStream2 {
    let mut checks: Vec<TokenStream2> = blocks
        .iter()
        .map(|block| quote! { ::std::option::Option::is_some(&#block) })
        .collect();

    if let Some(condition) = condition {
        checks.push(quote! { !::memery::__private::condition_holds(self, #condition) });
    }

    if checks.is_empty() {
        quote! { false }
    } else {
        quote! { #( #checks )||* }
    }
}

/// Returns true if `ty` is spelled `Option<..>`
pub fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        Type::Group(group) => is_option_type(&group.elem),
        _ => false,
    }
}
