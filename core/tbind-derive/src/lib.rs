//! tbind Derive — procedural macros for tbind.
//!
//! Provides `#[derive(Entity)]`, which declares a bound entity type.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, LitStr, Path, parse_macro_input};

/// Derive macro declaring an entity type.
///
/// # Example
///
/// ```ignore
/// #[derive(Entity)]
/// #[tbind(collection = "Site", validate = "validate_site")]
/// pub struct Site;
///
/// fn validate_site(record: &Record<Site>, errors: &mut Errors) {
///     if record.key().is_none() {
///         errors.add("_key", "can't be blank");
///     }
/// }
/// ```
///
/// Generates an `Entity` implementation with:
/// - `COLLECTION` — the `collection` attribute, or the type name
/// - `binding()` — a schema cell private to this type
/// - `validate()` — forwarding to the `validate` function, when given
#[proc_macro_derive(Entity, attributes(tbind))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !matches!(input.data, Data::Struct(_)) {
        return Err(syn::Error::new_spanned(
            name,
            "Entity can only be derived for structs",
        ));
    }
    // one binding cell per monomorphization is not expressible with a static
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let attrs = EntityAttrs::parse(input)?;
    let collection = attrs.collection.unwrap_or_else(|| name.to_string());

    let validate = attrs.validate.map(|path| {
        quote! {
            fn validate(
                record: &::tbind_core::Record<Self>,
                errors: &mut ::tbind_core::Errors,
            ) {
                #path(record, errors)
            }
        }
    });

    Ok(quote! {
        impl ::tbind_core::api::Entity for #name {
            const COLLECTION: &'static str = #collection;

            fn binding() -> &'static ::std::sync::OnceLock<::tbind_core::Schema> {
                static BINDING: ::std::sync::OnceLock<::tbind_core::Schema> =
                    ::std::sync::OnceLock::new();
                &BINDING
            }

            #validate
        }
    })
}

#[derive(Default)]
struct EntityAttrs {
    collection: Option<String>,
    validate: Option<Path>,
}

impl EntityAttrs {
    fn parse(input: &DeriveInput) -> syn::Result<Self> {
        let mut attrs = EntityAttrs::default();
        for attr in &input.attrs {
            if !attr.path().is_ident("tbind") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("collection") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().is_empty() {
                        return Err(meta.error("collection name must not be empty"));
                    }
                    attrs.collection = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("validate") {
                    let lit: LitStr = meta.value()?.parse()?;
                    attrs.validate = Some(lit.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `collection` or `validate`"))
                }
            })?;
        }
        Ok(attrs)
    }
}
