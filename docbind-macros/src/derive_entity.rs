use crate::prelude::*;

#[derive(FromAttributes, Default)]
#[darling(attributes(entity))]
struct Attributes {
    #[darling(default)]
    collection: Option<String>,
}

pub fn derive_entity(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    let attributes = Attributes::from_attributes(&input.attrs)?;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "generic entity types are not supported",
        ));
    }

    let span = input.span();
    let fields = field_models(&named_fields(span, input.data)?)?;

    let mut identity_fields = fields
        .iter()
        .filter(|field| field.external() == "_id")
        .map(|field| &field.ident);
    if identity_fields.next().is_none() {
        return Err(Error::new(
            span,
            "an entity must have a field whose external name is `_id` \
             (use `#[record(rename = \"_id\")]`)",
        ));
    }
    if let Some(second) = identity_fields.next() {
        return Err(Error::new(
            second.span(),
            "only one field may have the external name `_id`",
        ));
    }

    let collection = match attributes.collection {
        Some(collection) => {
            if collection.is_empty() {
                return Err(Error::new(span, "collection name must not be empty"));
            }
            collection
        }
        None => input.ident.to_string().to_snake_case(),
    };

    Ok(build(&input.ident, &collection))
}

fn build(ident: &Ident, collection: &str) -> TokenStream {
    let krate = krate();
    let collection = LitStr::new(collection, Span::call_site());

    quote! {
        impl #krate::entity::Entity for #ident {
            fn collection_name() -> &'static str {
                #collection
            }
        }

        #krate::inventory::submit! {
            #krate::entity::EntityMetaWrapper(#krate::entity::EntityMeta::new(
                ::core::any::TypeId::of::<#ident>,
                ::core::stringify!(#ident),
                #collection,
                #krate::entity::external_names::<#ident>,
                #krate::entity::has_id_field::<#ident>,
            ))
        }
    }
}
