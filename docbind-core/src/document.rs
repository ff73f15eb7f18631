//! Record types and the document conversion engine.
//!
//! This module defines the [`Record`] trait implemented by every mappable
//! struct, the [`FieldSpec`] side-table describing each field, and the
//! decoding machinery ([`decode_field`], [`DecodeOptions`]) that rebuilds
//! records from stored documents.
//!
//! A record converts to a [`Document`] keyed by each field's external name
//! and converts back field by field, recursing through nested records,
//! arrays, and maps. Unknown keys in a stored document are always ignored;
//! what happens to fields the document lacks is governed by
//! [`MissingFieldPolicy`].

use bson::{Bson, Document};

use crate::convert::FromBson;
use crate::error::{OdmError, OdmResult};

/// Describes one declared field of a [`Record`].
///
/// Field specs are built once at type-definition time (normally by
/// `#[derive(Record)]`) and consulted for every conversion; the declaration
/// is never re-introspected. The two function pointers give the engine typed
/// access to the field without knowing its type.
pub struct FieldSpec<R> {
    /// The field's declared name.
    pub name: &'static str,
    /// External-name override, when the stored key differs from the
    /// declared name.
    pub rename: Option<&'static str>,
    /// Marks the field as unique within its collection. Metadata only;
    /// this layer never creates indexes.
    pub unique: bool,
    /// Reads the field from a record and serializes it.
    pub get: fn(&R) -> OdmResult<Bson>,
    /// Deserializes a value and assigns it to the field.
    pub set: fn(&mut R, Bson) -> OdmResult<()>,
}

impl<R> FieldSpec<R> {
    /// Returns the field's on-the-wire name: the override if one is
    /// declared, else the declared name.
    pub fn external_name(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }
}

impl<R> std::fmt::Debug for FieldSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("rename", &self.rename)
            .field("unique", &self.unique)
            .finish_non_exhaustive()
    }
}

/// What to do when a stored document lacks a field that declares no
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Fail with [`OdmError::MissingField`]. The default.
    #[default]
    Strict,
    /// Feed the field's own decoder a BSON null and let the field type
    /// enforce its requirements. Null-tolerant fields decode to their
    /// empty form; anything else fails with its own conversion error.
    Lenient,
}

/// Per-call decoding configuration, threaded through nested records and
/// containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Missing-field handling. Defaults to
    /// [`MissingFieldPolicy::Strict`].
    pub missing_fields: MissingFieldPolicy,
}

impl DecodeOptions {
    /// Options with the default strict missing-field policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the lenient missing-field policy.
    pub fn lenient() -> Self {
        Self {
            missing_fields: MissingFieldPolicy::Lenient,
        }
    }

    /// Sets the missing-field policy.
    pub fn missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = policy;
        self
    }
}

/// A struct that can cross the document boundary.
///
/// Implementors expose an ordered field table and convert to and from
/// [`Document`] values. Most types get this via `#[derive(Record)]`, which
/// also derives the matching [`ToBson`](crate::convert::ToBson) and
/// [`FromBson`] implementations so records nest inside other records,
/// arrays, and maps.
///
/// A `Record` is not yet an entity: it has no storage binding. See
/// [`Entity`](crate::entity::Entity).
///
/// # Example
///
/// ```ignore
/// use docbind::prelude::*;
///
/// #[derive(Debug, PartialEq, Record)]
/// pub struct Address {
///     pub street: String,
///     pub city: String,
/// }
///
/// let address = Address { street: "10 Main St".into(), city: "Dover".into() };
/// let doc = address.to_document()?;
/// assert_eq!(Address::from_document(doc)?, address);
/// ```
pub trait Record: Sized + Send + Sync + 'static {
    /// The record type's name, for diagnostics.
    fn record_name() -> &'static str;

    /// The field side-table, in declaration order.
    fn fields() -> &'static [FieldSpec<Self>];

    /// Serializes the record into a document keyed by external field
    /// names.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::Conversion`] when a field value cannot be
    /// represented. No partial document is ever returned.
    fn to_document(&self) -> OdmResult<Document> {
        let mut document = Document::new();
        for field in Self::fields() {
            document.insert(field.external_name(), (field.get)(self)?);
        }
        Ok(document)
    }

    /// Rebuilds a record from a stored document using default
    /// [`DecodeOptions`].
    ///
    /// Keys in the document that match no declared field are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::MissingField`] for an absent field with no
    /// declared default (strict mode), or [`OdmError::Conversion`] when a
    /// value does not fit the field's type.
    fn from_document(document: Document) -> OdmResult<Self> {
        Self::from_document_with(document, &DecodeOptions::default())
    }

    /// Rebuilds a record from a stored document with explicit options.
    fn from_document_with(document: Document, options: &DecodeOptions) -> OdmResult<Self>;
}

/// Looks up the [`FieldSpec`] for a declared field name.
///
/// Returns `None` for names that match no declared field; never fails.
pub fn field_meta<R: Record>(name: &str) -> Option<&'static FieldSpec<R>> {
    R::fields().iter().find(|field| field.name == name)
}

/// Decodes one field out of a document, honoring declared defaults and the
/// missing-field policy.
///
/// This is the per-field path used by generated `from_document_with`
/// implementations. The external name is resolved through the field table,
/// and the value (present, defaulted, or policy-supplied null) runs through
/// the field type's [`FromBson`] implementation.
pub fn decode_field<R: Record, T: FromBson>(
    document: &mut Document,
    field: &'static str,
    default: Option<fn() -> T>,
    options: &DecodeOptions,
) -> OdmResult<T> {
    let external = field_meta::<R>(field)
        .map(FieldSpec::external_name)
        .unwrap_or(field);

    match document.remove(external) {
        Some(value) => T::from_bson_with(value, options),
        None => match default {
            Some(make) => Ok(make()),
            None => match options.missing_fields {
                MissingFieldPolicy::Strict => Err(OdmError::MissingField {
                    record: R::record_name(),
                    field,
                }),
                MissingFieldPolicy::Lenient => T::from_bson_with(Bson::Null, options),
            },
        },
    }
}
