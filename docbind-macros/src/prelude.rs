pub(crate) use crate::utils::{DefaultKind, FieldModel, field_models, krate, named_fields};
pub use darling::{FromAttributes, util::Override};
pub use heck::ToSnakeCase;
pub use proc_macro2::{Span, TokenStream};
pub use quote::quote;
pub use std::collections::HashSet;
pub use syn::{
    Data, DeriveInput, Error, Fields, FieldsNamed, Ident, LitStr, Path, Result, Type, parse2,
    spanned::Spanned,
};
