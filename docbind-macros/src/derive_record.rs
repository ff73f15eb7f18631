use crate::prelude::*;

pub fn derive_record(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "generic record types are not supported",
        ));
    }

    let fields = {
        let named = named_fields(input.span(), input.data)?;
        field_models(&named)?
    };

    let mut seen = HashSet::new();
    for field in &fields {
        if !seen.insert(field.external()) {
            return Err(Error::new(
                field.ident.span(),
                format!("duplicate external field name `{}`", field.external()),
            ));
        }
    }

    Ok(build(&input.ident, &fields))
}

fn build(ident: &Ident, fields: &[FieldModel]) -> TokenStream {
    let krate = krate();
    let field_count = fields.len();

    let specs = fields.iter().map(|field| {
        let field_ident = &field.ident;
        let name = LitStr::new(&field.ident.to_string(), Span::call_site());
        let rename = match &field.rename {
            Some(rename) => {
                let lit = LitStr::new(rename, Span::call_site());
                quote! { ::core::option::Option::Some(#lit) }
            }
            None => quote! { ::core::option::Option::None },
        };
        let unique = field.unique;
        quote! {
            #krate::document::FieldSpec {
                name: #name,
                rename: #rename,
                unique: #unique,
                get: |record: &#ident| #krate::convert::ToBson::to_bson(&record.#field_ident),
                set: |record: &mut #ident, value: #krate::bson::Bson| {
                    record.#field_ident = #krate::convert::FromBson::from_bson(value)?;
                    ::core::result::Result::Ok(())
                },
            }
        }
    });

    let decodes = fields.iter().map(|field| {
        let field_ident = &field.ident;
        let name = LitStr::new(&field.ident.to_string(), Span::call_site());
        let ty = &field.ty;
        let default = match &field.default {
            DefaultKind::None => quote! { ::core::option::Option::None },
            DefaultKind::TypeDefault => quote! {
                ::core::option::Option::Some(<#ty as ::core::default::Default>::default)
            },
            DefaultKind::Factory(path) => quote! { ::core::option::Option::Some(#path) },
        };
        quote! {
            #field_ident: #krate::document::decode_field::<Self, _>(
                &mut document,
                #name,
                #default,
                options,
            )?
        }
    });

    quote! {
        impl #krate::document::Record for #ident {
            fn record_name() -> &'static str {
                ::core::stringify!(#ident)
            }

            fn fields() -> &'static [#krate::document::FieldSpec<Self>] {
                static FIELDS: [#krate::document::FieldSpec<#ident>; #field_count] = [
                    #( #specs ),*
                ];
                &FIELDS
            }

            fn from_document_with(
                mut document: #krate::bson::Document,
                options: &#krate::document::DecodeOptions,
            ) -> #krate::error::OdmResult<Self> {
                ::core::result::Result::Ok(Self {
                    #( #decodes ),*
                })
            }
        }

        impl #krate::convert::ToBson for #ident {
            fn to_bson(&self) -> #krate::error::OdmResult<#krate::bson::Bson> {
                ::core::result::Result::Ok(#krate::bson::Bson::Document(
                    #krate::document::Record::to_document(self)?,
                ))
            }
        }

        impl #krate::convert::FromBson for #ident {
            fn from_bson(value: #krate::bson::Bson) -> #krate::error::OdmResult<Self> {
                <Self as #krate::convert::FromBson>::from_bson_with(
                    value,
                    &#krate::document::DecodeOptions::new(),
                )
            }

            fn from_bson_with(
                value: #krate::bson::Bson,
                options: &#krate::document::DecodeOptions,
            ) -> #krate::error::OdmResult<Self> {
                match value {
                    #krate::bson::Bson::Document(document) => {
                        <Self as #krate::document::Record>::from_document_with(document, options)
                    }
                    other => ::core::result::Result::Err(#krate::error::OdmError::conversion(
                        ::core::stringify!(#ident),
                        &other,
                    )),
                }
            }
        }
    }
}
