//! Entity types, classification, and identity access.
//!
//! A [`Record`] becomes an entity by carrying a storage binding: a
//! collection name attached at the type level through the [`Entity`] trait
//! and registered in a process-wide registry at type-definition time.
//! `#[derive(Entity)]` implements the trait and submits an [`EntityMeta`]
//! descriptor through [`inventory`]; hand-written implementations register
//! the same way:
//!
//! ```ignore
//! docbind::inventory::submit! {
//!     EntityMetaWrapper(EntityMeta::new(
//!         std::any::TypeId::of::<Gadget>,
//!         "Gadget",
//!         "gadgets",
//!         external_names::<Gadget>,
//!         has_id_field::<Gadget>,
//!     ))
//! }
//! ```
//!
//! The registry backs the classification predicates ([`is_entity_type`],
//! [`is_entity_instance`], [`is_entity`]) and the pre-flight guard the CRUD
//! layer runs before touching a driver. Lookups are memoized in an index
//! keyed by [`TypeId`], built once and immutable afterwards; registration
//! happens at link time, so the index never needs invalidation.
//!
//! The identity accessors ([`get_id`], [`set_id`]) and the classifier share
//! one resolution rule, [`id_field`]: the identity field is the field whose
//! external name is [`ID_FIELD`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::LazyLock;

use bson::Bson;

use crate::document::{FieldSpec, Record};
use crate::error::{OdmError, OdmResult};

/// External name of the identity field.
pub const ID_FIELD: &str = "_id";

/// A [`Record`] bound to a collection in the external store.
///
/// The binding is type-level: every instance of the type shares it. The
/// type must also expose exactly one field whose external name is
/// [`ID_FIELD`]; a type with a binding but no identity field (or the
/// reverse) is not a mapped entity.
///
/// Normally obtained via `#[derive(Entity)]`, which also registers the
/// type's [`EntityMeta`] descriptor.
pub trait Entity: Record {
    /// Returns the name of the collection this entity is stored in.
    fn collection_name() -> &'static str;
}

/// Descriptor for a registered entity type.
///
/// Built once per type at registration. The function pointers read through
/// the type's own field table, so classification, identity resolution, and
/// conversion can never disagree about a field's external name.
pub struct EntityMeta {
    type_id: fn() -> TypeId,
    type_name: &'static str,
    collection: &'static str,
    external_names: fn() -> Vec<&'static str>,
    has_id: fn() -> bool,
}

impl EntityMeta {
    /// Builds a descriptor. Used by `#[derive(Entity)]` and by manual
    /// registrations.
    pub const fn new(
        type_id: fn() -> TypeId,
        type_name: &'static str,
        collection: &'static str,
        external_names: fn() -> Vec<&'static str>,
        has_id: fn() -> bool,
    ) -> Self {
        EntityMeta {
            type_id,
            type_name,
            collection,
            external_names,
            has_id,
        }
    }

    /// The entity type's name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The bound collection name.
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// Checks the declaration for internal contradictions.
    ///
    /// # Errors
    ///
    /// [`OdmError::Configuration`] when two fields resolve to the same
    /// external name (including two fields claiming the identity role) or
    /// the collection name is empty; [`OdmError::TypeMismatch`] when no
    /// field resolves to [`ID_FIELD`].
    pub fn validate(&self) -> OdmResult<()> {
        let names = (self.external_names)();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(OdmError::Configuration(format!(
                    "`{}` declares the external field name `{}` more than once",
                    self.type_name, name
                )));
            }
        }
        if self.collection.is_empty() {
            return Err(OdmError::Configuration(format!(
                "`{}` is bound to an empty collection name",
                self.type_name
            )));
        }
        if !(self.has_id)() {
            return Err(OdmError::TypeMismatch(format!(
                "`{}` has no identity field (no field named `{ID_FIELD}`)",
                self.type_name
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMeta")
            .field("type_name", &self.type_name)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[doc(hidden)]
pub struct EntityMetaWrapper(pub EntityMeta);

inventory::collect!(EntityMetaWrapper);

fn index() -> &'static HashMap<TypeId, &'static EntityMeta> {
    static INDEX: LazyLock<HashMap<TypeId, &'static EntityMeta>> = LazyLock::new(|| {
        inventory::iter::<EntityMetaWrapper>
            .into_iter()
            .map(|wrapper| ((wrapper.0.type_id)(), &wrapper.0))
            .collect()
    });
    &INDEX
}

/// Iterates over every registered entity descriptor.
pub fn registered_entities() -> impl Iterator<Item = &'static EntityMeta> {
    inventory::iter::<EntityMetaWrapper>
        .into_iter()
        .map(|wrapper| &wrapper.0)
}

/// Returns the registered descriptor for `T`, if any.
pub fn entity_meta<T: Any>() -> Option<&'static EntityMeta> {
    index().get(&TypeId::of::<T>()).copied()
}

fn classified(type_id: TypeId) -> bool {
    index()
        .get(&type_id)
        .is_some_and(|meta| meta.validate().is_ok())
}

/// True iff `T` is a registered entity type with a valid declaration.
///
/// Never fails; unregistered and non-record types classify as `false`.
pub fn is_entity_type<T: Any>() -> bool {
    classified(TypeId::of::<T>())
}

/// True iff the value is an instance of a registered entity type.
///
/// Accepts any value; primitives and unregistered types classify as
/// `false`.
pub fn is_entity_instance(value: &dyn Any) -> bool {
    classified(value.type_id())
}

/// Permissive check accepting either a type or an instance.
///
/// A [`TypeId`] value is treated as a type-level query; anything else is
/// classified as an instance.
pub fn is_entity(value: &dyn Any) -> bool {
    match value.downcast_ref::<TypeId>() {
        Some(type_id) => classified(*type_id),
        None => is_entity_instance(value),
    }
}

/// The guard run by every CRUD operation before any driver call.
pub(crate) fn require<E: Entity>() -> OdmResult<&'static EntityMeta> {
    let meta = entity_meta::<E>().ok_or_else(|| {
        OdmError::TypeMismatch(format!(
            "`{}` is not a registered entity type",
            E::record_name()
        ))
    })?;
    meta.validate()?;
    Ok(meta)
}

/// Resolves the identity field of a record type.
///
/// This is the single resolution rule shared by classification and the
/// identity accessors: the field whose external name equals [`ID_FIELD`].
pub fn id_field<R: Record>() -> Option<&'static FieldSpec<R>> {
    R::fields()
        .iter()
        .find(|field| field.external_name() == ID_FIELD)
}

/// True iff `R` declares an identity field. Used by generated descriptors.
pub fn has_id_field<R: Record>() -> bool {
    id_field::<R>().is_some()
}

/// Collects the external names of `R`'s fields, in declaration order. Used
/// by generated descriptors.
pub fn external_names<R: Record>() -> Vec<&'static str> {
    R::fields().iter().map(FieldSpec::external_name).collect()
}

/// Returns the current value of the record's identity field.
///
/// # Errors
///
/// [`OdmError::TypeMismatch`] when the type declares no identity field.
pub fn get_id<R: Record>(record: &R) -> OdmResult<Bson> {
    let field = id_field::<R>().ok_or_else(|| no_id_error::<R>())?;
    (field.get)(record)
}

/// Assigns the record's identity field.
///
/// The value passes through the field's own deserialize half, so a
/// driver-generated key (say, an `ObjectId`) lands in whatever shape the
/// field declares.
///
/// # Errors
///
/// [`OdmError::TypeMismatch`] when the type declares no identity field;
/// [`OdmError::Conversion`] when the value does not fit the field's type.
pub fn set_id<R: Record>(record: &mut R, value: Bson) -> OdmResult<()> {
    let field = id_field::<R>().ok_or_else(|| no_id_error::<R>())?;
    (field.set)(record, value)
}

fn no_id_error<R: Record>() -> OdmError {
    OdmError::TypeMismatch(format!(
        "`{}` has no identity field (no field named `{ID_FIELD}`)",
        R::record_name()
    ))
}
