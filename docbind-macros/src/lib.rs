//! Procedural macros for the docbind project.
//!
//! Provides the two derives that turn a plain struct into a mapped record:
//!
//! - `#[derive(Record)]`: field metadata table plus the document and BSON
//!   conversion impls, with `#[record(rename = "...")]`,
//!   `#[record(default)]` / `#[record(default = "path")]`, and
//!   `#[record(unique)]` field attributes
//! - `#[derive(Entity)]`: storage binding plus registry submission, with
//!   an optional `#[entity(collection = "...")]` override

mod derive_entity;
mod derive_record;
mod prelude;
mod utils;

fn expand<F: FnOnce(proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream>>(
    fun: F,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    fun(input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[proc_macro_derive(Record, attributes(record))]
pub fn record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_record::derive_record, input)
}

#[proc_macro_derive(Entity, attributes(entity, record))]
pub fn entity(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_entity::derive_entity, input)
}
