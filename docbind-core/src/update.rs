//! Convenience constructors for update documents.
//!
//! The repository's `update_one` accepts any update document verbatim;
//! nothing here is ever required. These helpers just keep operator names
//! out of call sites:
//!
//! ```ignore
//! use docbind::update;
//! use bson::doc;
//!
//! let update = update::merge([
//!     update::set(doc! { "name": "Alice" }),
//!     update::inc(doc! { "logins": 1 }),
//! ]);
//! // { "$set": { "name": "Alice" }, "$inc": { "logins": 1 } }
//! ```
//!
//! [`set_fields`] builds a `$set` payload from a record's own serialized
//! form, restricted to named fields, with nested documents flattened to
//! dotted paths so sibling fields in the store survive the update.

use bson::{Bson, Document, doc};

use crate::document::Record;
use crate::error::{OdmError, OdmResult};

/// `{ "$set": fields }`
pub fn set(fields: Document) -> Document {
    doc! { "$set": fields }
}

/// `{ "$unset": { field: "" } }` for each named field.
pub fn unset(fields: &[&str]) -> Document {
    let mut payload = Document::new();
    for field in fields {
        payload.insert(*field, "");
    }
    doc! { "$unset": payload }
}

/// `{ "$inc": fields }`
pub fn inc(fields: Document) -> Document {
    doc! { "$inc": fields }
}

/// `{ "$mul": fields }`
pub fn mul(fields: Document) -> Document {
    doc! { "$mul": fields }
}

/// `{ "$min": fields }`
pub fn min(fields: Document) -> Document {
    doc! { "$min": fields }
}

/// `{ "$max": fields }`
pub fn max(fields: Document) -> Document {
    doc! { "$max": fields }
}

/// `{ "$push": fields }`
pub fn push(fields: Document) -> Document {
    doc! { "$push": fields }
}

/// `{ "$pull": fields }`
pub fn pull(fields: Document) -> Document {
    doc! { "$pull": fields }
}

/// `{ "$addToSet": fields }`
pub fn add_to_set(fields: Document) -> Document {
    doc! { "$addToSet": fields }
}

/// `{ "$pop": fields }` with `1` (last) or `-1` (first) per field.
pub fn pop(fields: Document) -> Document {
    doc! { "$pop": fields }
}

/// `{ "$pullAll": fields }`
pub fn pull_all(fields: Document) -> Document {
    doc! { "$pullAll": fields }
}

/// `{ "$rename": fields }`
pub fn rename(fields: Document) -> Document {
    doc! { "$rename": fields }
}

/// `{ "$currentDate": { field: true } }` for each named field.
pub fn current_date(fields: &[&str]) -> Document {
    let mut payload = Document::new();
    for field in fields {
        payload.insert(*field, true);
    }
    doc! { "$currentDate": payload }
}

/// `{ "$setOnInsert": fields }`
pub fn set_on_insert(fields: Document) -> Document {
    doc! { "$setOnInsert": fields }
}

/// Combines several update documents into one.
///
/// Same-operator payloads are merged key by key, later documents winning
/// on a repeated key.
pub fn merge<I>(updates: I) -> Document
where
    I: IntoIterator<Item = Document>,
{
    let mut merged = Document::new();
    for update in updates {
        for (operator, value) in update {
            let payload = match (merged.remove(&operator), value) {
                (Some(Bson::Document(mut existing)), Bson::Document(incoming)) => {
                    for (key, value) in incoming {
                        existing.insert(key, value);
                    }
                    Bson::Document(existing)
                }
                (_, value) => value,
            };
            merged.insert(operator, payload);
        }
    }
    merged
}

/// Builds a `$set` update from the named fields of a record.
///
/// Fields are addressed by their declared (struct) names and emitted under
/// their external names. Values come from the record's own serialize half,
/// so a nested record lands as a nested document, which is then flattened
/// into dotted paths (`"inner.a": 1`); arrays are set wholesale.
///
/// # Errors
///
/// [`OdmError::Configuration`] for a name matching no declared field;
/// [`OdmError::Conversion`] when a named field fails to serialize.
pub fn set_fields<R: Record>(record: &R, fields: &[&str]) -> OdmResult<Document> {
    let mut payload = Document::new();
    for name in fields {
        let field = crate::document::field_meta::<R>(name).ok_or_else(|| {
            OdmError::Configuration(format!(
                "`{}` has no field named `{}`",
                R::record_name(),
                name
            ))
        })?;
        flatten_into(field.external_name(), (field.get)(record)?, &mut payload);
    }
    Ok(set(payload))
}

fn flatten_into(prefix: &str, value: Bson, out: &mut Document) {
    match value {
        Bson::Document(document) if !document.is_empty() => {
            for (key, value) in document {
                flatten_into(&format!("{prefix}.{key}"), value, out);
            }
        }
        other => {
            out.insert(prefix, other);
        }
    }
}
