//! Procedural macros for Tarkib.
//!
//! `#[derive(Resolvable)]` writes the `TypeInfo` descriptor of a struct with
//! named fields or of a unit struct.
//!
//! Field attributes:
//! - `#[resolvable]`: resolvable property, built from its own type when no
//!   mapping exists
//! - `#[resolvable(mapped)]`: resolvable property filled only through a
//!   mapping (`Box<dyn Trait>` slots)
//! - `#[resolvable(base)]`: the embedded base part
//! - `#[resolvable(skip)]`: not described at all
//!
//! Unannotated fields are plain properties: injected when a value of their
//! type is registered.
//!
//! Struct attributes:
//! - `#[resolvable(no_default)]`: no zero-argument initializer
//! - `#[resolvable(upcast = "Box<dyn Store>")]`: assignable to that slot,
//!   converted with `Box::new`. Repeatable.

use darling::ast::Data;
use darling::util::Ignored;
use darling::{Error, FromDeriveInput};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{DeriveInput, Field, Meta, Type, parse_macro_input, parse_quote};

#[derive(FromDeriveInput)]
#[darling(attributes(resolvable), supports(struct_named, struct_unit))]
struct ResolvableInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<Ignored, Field>,
    #[darling(default)]
    no_default: bool,
    #[darling(multiple)]
    upcast: Vec<Type>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldRole {
    Plain,
    Resolvable,
    Mapped,
    Base,
    Skip,
}

#[proc_macro_derive(Resolvable, attributes(resolvable))]
pub fn derive_resolvable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}

fn expand(input: &DeriveInput) -> darling::Result<TokenStream2> {
    let parsed = ResolvableInput::from_derive_input(input)?;

    if let Some(lifetime) = parsed.generics.lifetimes().next() {
        return Err(Error::custom("Resolvable types must be 'static and cannot borrow")
            .with_span(&lifetime.lifetime));
    }

    let fields = match &parsed.data {
        Data::Struct(fields) => &fields.fields,
        Data::Enum(_) => return Err(Error::unsupported_shape("enum")),
    };

    let mut errors = Error::accumulator();
    let mut calls = Vec::new();
    let mut has_base = false;

    for field in fields {
        let Some(role) = errors.handle(field_role(field).map_err(Error::from)) else {
            continue;
        };
        if role == FieldRole::Base {
            if has_base {
                errors.push(Error::custom("only one field can be the base").with_span(field));
                continue;
            }
            has_base = true;
        }
        if let Some(call) = field_call(field, role) {
            calls.push(call);
        }
    }

    for target in &parsed.upcast {
        if let Some(call) = errors.handle(upcast_call(target)) {
            calls.push(call);
        }
    }

    errors.finish()?;

    let initializer = (!parsed.no_default).then(|| quote!(.default_initializer()));

    let mut generics = parsed.generics.clone();
    let where_clause = generics.make_where_clause();
    for param in parsed.generics.type_params() {
        let ident = &param.ident;
        where_clause.predicates.push(parse_quote!(
            #ident: ::std::marker::Send + ::std::marker::Sync + 'static
        ));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let ident = &parsed.ident;

    Ok(quote! {
        impl #impl_generics ::tarkib::Resolvable for #ident #ty_generics #where_clause {
            fn type_info() -> ::tarkib::TypeInfo {
                ::tarkib::TypeInfo::builder::<Self>()
                    #initializer
                    #(#calls)*
                    .build()
            }
        }
    })
}

fn field_role(field: &Field) -> syn::Result<FieldRole> {
    let mut role = FieldRole::Plain;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("resolvable")) {
        if let Meta::Path(_) = attr.meta {
            role = FieldRole::Resolvable;
            continue;
        }

        attr.parse_nested_meta(|meta| {
            role = if meta.path.is_ident("base") {
                FieldRole::Base
            } else if meta.path.is_ident("mapped") {
                FieldRole::Mapped
            } else if meta.path.is_ident("skip") {
                FieldRole::Skip
            } else {
                return Err(meta.error("expected `base`, `mapped` or `skip`"));
            };
            Ok(())
        })?;
    }

    Ok(role)
}

fn field_call(field: &Field, role: FieldRole) -> Option<TokenStream2> {
    let member = field.ident.as_ref()?;
    let ty = &field.ty;
    let name = member.to_string();
    let name = name.strip_prefix("r#").unwrap_or(&name);
    let access = quote!(|this: &mut Self| &mut this.#member);

    let call = match role {
        FieldRole::Plain => quote!(.property::<#ty>(#name, #access)),
        FieldRole::Resolvable => quote!(.resolvable::<#ty>(#name, #access)),
        FieldRole::Mapped => quote!(.mapped::<#ty>(#name, #access)),
        FieldRole::Base => quote!(.base::<#ty>(#access)),
        FieldRole::Skip => return None,
    };
    Some(call)
}

/// `Box<dyn Store>` becomes `.upcast::<Box<dyn Store>>(|this| Box::new(this))`.
fn upcast_call(target: &Type) -> darling::Result<TokenStream2> {
    let Type::Path(path) = target else {
        return Err(Error::custom("upcast target must be a pointer type such as Box<dyn Trait>")
            .with_span(target));
    };

    let mut constructor = path.path.clone();
    let Some(last) = constructor.segments.last_mut() else {
        return Err(Error::custom("empty upcast target").with_span(target));
    };
    if last.arguments.is_none() {
        return Err(Error::custom("upcast target must wrap the type, e.g. Arc<dyn Trait>")
            .with_span(target));
    }
    last.arguments = syn::PathArguments::None;

    let target = target.to_token_stream();
    Ok(quote!(.upcast::<#target>(|this| #constructor::new(this))))
}
