use crate::prelude::*;
use proc_macro_crate::{FoundCrate, crate_name};

/// Resolves the path the generated code uses to reach the library: the
/// core crate when it is a direct dependency, the facade crate otherwise.
pub fn krate() -> TokenStream {
    match crate_name("docbind-core").or_else(|_| crate_name("docbind")) {
        Ok(FoundCrate::Itself) => quote! { crate },
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote! { ::#ident }
        }
        Err(_) => quote! { ::docbind },
    }
}

pub fn named_fields(span: Span, data: Data) -> Result<FieldsNamed> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(span, "expected a struct"));
    };

    let Fields::Named(named) = data_struct.fields else {
        return Err(Error::new(span, "expected a struct with named fields"));
    };

    Ok(named)
}

/// One declared field plus its parsed `#[record(...)]` attributes.
pub struct FieldModel {
    pub ident: Ident,
    pub ty: Type,
    pub rename: Option<String>,
    pub default: DefaultKind,
    pub unique: bool,
}

impl FieldModel {
    pub fn external(&self) -> String {
        self.rename
            .clone()
            .unwrap_or_else(|| self.ident.to_string())
    }
}

pub enum DefaultKind {
    /// Genuinely required: no value, no default.
    None,
    /// `#[record(default)]`, or an `Option` field with no explicit default.
    TypeDefault,
    /// `#[record(default = "path")]`: a factory function.
    Factory(Path),
}

#[derive(FromAttributes, Default)]
#[darling(attributes(record))]
struct RecordFieldAttrs {
    #[darling(default)]
    rename: Option<String>,
    #[darling(default)]
    default: Option<Override<Path>>,
    #[darling(default)]
    unique: bool,
}

pub fn field_models(fields: &FieldsNamed) -> Result<Vec<FieldModel>> {
    fields
        .named
        .iter()
        .map(|field| {
            let attrs = RecordFieldAttrs::from_attributes(&field.attrs)?;
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
            let default = match attrs.default {
                Some(Override::Explicit(path)) => DefaultKind::Factory(path),
                Some(Override::Inherit) => DefaultKind::TypeDefault,
                None if is_option(&field.ty) => DefaultKind::TypeDefault,
                None => DefaultKind::None,
            };
            Ok(FieldModel {
                ident,
                ty: field.ty.clone(),
                rename: attrs.rename,
                default,
                unique: attrs.unique,
            })
        })
        .collect()
}

fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
