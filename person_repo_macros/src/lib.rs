extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::{
    DeriveInput, Ident, LitStr, Token,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

struct CollectionArgs {
    pub entity_name: Option<LitStr>,
    pub primary_key: Option<LitStr>,
}

impl Parse for CollectionArgs {
    fn parse(input: ParseStream) -> Result<Self, syn::Error> {
        let mut entity_name = None;
        let mut primary_key = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    entity_name = Some(input.parse()?);
                }
                "primary_key" => {
                    primary_key = Some(input.parse()?);
                }
                _ => return Err(syn::Error::new_spanned(ident, "Unknown argument")),
            }

            // Optional comma
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(CollectionArgs {
            entity_name,
            primary_key,
        })
    }
}

/// Attach a collection definition to a model.
///
/// ```ignore
/// #[derive(Collection)]
/// #[collection(name = "person", primary_key = "_id")]
/// struct Person { /* ... */ }
///
/// let entity = Person::entity();
/// ```
///
/// The collection name defaults to the lowercased type name and the primary
/// key to `_id`.
#[proc_macro_derive(Collection, attributes(collection))]
pub fn derive_collection(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let args = match input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("collection"))
        .map(|attr| attr.parse_args::<CollectionArgs>())
        .transpose()
    {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let entity_name = args
        .as_ref()
        .and_then(|a| a.entity_name.as_ref())
        .map(|n| n.value())
        .unwrap_or_else(|| name.to_string().to_lowercase());

    let primary_key = args
        .as_ref()
        .and_then(|a| a.primary_key.as_ref())
        .map(|n| n.value())
        .unwrap_or_else(|| "_id".to_string());

    let expanded = quote! {
        impl #name {
            pub const COLLECTION: &'static str = #entity_name;

            pub fn entity() -> ::person_repo_core::entity::Entity {
                ::person_repo_core::entity::Entity::new(#entity_name).primary_key(#primary_key)
            }
        }
    };

    TokenStream::from(expanded)
}
