//! Filter matching and update application for the in-memory driver.
//!
//! This module evaluates the Mongo-style filter and update documents the
//! driver contract traffics in, against plain BSON documents. It covers
//! the comparison and logical operators plus implicit equality for
//! filters, and the common field/array operators for updates; anything
//! outside that set is rejected rather than silently ignored.

use std::cmp::Ordering;
use std::collections::HashMap;

use bson::{Bson, DateTime, Document};

use crate::MemoryDriverError;

/// Type-erased, comparable view of a BSON value.
///
/// Numeric types normalize to f64 so `3_i32` and `3.0` compare equal, the
/// way the server compares them. Types with no meaningful order (object
/// ids, binary, ...) fall through to [`Comparable::Other`], which is
/// equality-only.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(array) => {
                Comparable::Array(array.iter().map(Comparable::from).collect())
            }
            Bson::Document(document) => Comparable::Map(
                document
                    .iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

pub(crate) fn equals(a: &Bson, b: &Bson) -> bool {
    Comparable::from(a) == Comparable::from(b)
}

/// Mongo equality: a direct match, or the stored value is an array
/// containing the expected value.
fn matches_value(stored: &Bson, expected: &Bson) -> bool {
    if equals(stored, expected) {
        return true;
    }
    if let Bson::Array(elements) = stored {
        return elements.iter().any(|element| equals(element, expected));
    }
    false
}

/// Equality against a possibly missing field. A `null` condition also
/// matches documents where the field is absent.
fn matches_eq(stored: Option<&Bson>, expected: &Bson) -> bool {
    match stored {
        Some(value) => matches_value(value, expected),
        None => matches!(expected, Bson::Null),
    }
}

/// Walks a dotted path through nested documents.
fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut current = document;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        current = value.as_document()?;
    }
    None
}

/// Evaluates one field condition: either an operator document
/// (`{ "$gte": 18 }`) or a literal value for implicit equality.
fn matches_condition(stored: Option<&Bson>, condition: &Bson) -> Result<bool, MemoryDriverError> {
    if let Bson::Document(operators) = condition {
        if operators.keys().any(|key| key.starts_with('$')) {
            for (operator, argument) in operators {
                let hit = match operator.as_str() {
                    "$eq" => matches_eq(stored, argument),
                    "$ne" => !matches_eq(stored, argument),
                    "$gt" => compare(stored, argument, |ordering| ordering == Ordering::Greater),
                    "$gte" => compare(stored, argument, |ordering| {
                        ordering != Ordering::Less
                    }),
                    "$lt" => compare(stored, argument, |ordering| ordering == Ordering::Less),
                    "$lte" => compare(stored, argument, |ordering| {
                        ordering != Ordering::Greater
                    }),
                    "$in" => {
                        let Bson::Array(choices) = argument else {
                            return Err(MemoryDriverError::BadOperatorArgument {
                                operator: "$in",
                                expected: "an array",
                            });
                        };
                        stored.is_some_and(|value| {
                            choices.iter().any(|choice| matches_value(value, choice))
                        })
                    }
                    "$nin" => {
                        let Bson::Array(choices) = argument else {
                            return Err(MemoryDriverError::BadOperatorArgument {
                                operator: "$nin",
                                expected: "an array",
                            });
                        };
                        !stored.is_some_and(|value| {
                            choices.iter().any(|choice| matches_value(value, choice))
                        })
                    }
                    "$exists" => {
                        let expected = argument.as_bool().ok_or(
                            MemoryDriverError::BadOperatorArgument {
                                operator: "$exists",
                                expected: "a boolean",
                            },
                        )?;
                        stored.is_some() == expected
                    }
                    other => {
                        return Err(MemoryDriverError::UnsupportedFilterOperator(
                            other.to_string(),
                        ));
                    }
                };
                if !hit {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    // Literal condition, implicit equality.
    Ok(matches_eq(stored, condition))
}

fn compare(stored: Option<&Bson>, argument: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    match Comparable::from(stored).partial_cmp(&Comparable::from(argument)) {
        Some(ordering) => accept(ordering),
        None => false,
    }
}

/// True iff `document` satisfies every clause of `filter`.
///
/// An empty filter matches everything.
pub fn matches_filter(
    document: &Document,
    filter: &Document,
) -> Result<bool, MemoryDriverError> {
    for (key, condition) in filter {
        match key.as_str() {
            "$and" => {
                for clause in branch_clauses("$and", condition)? {
                    if !matches_filter(document, clause)? {
                        return Ok(false);
                    }
                }
            }
            "$or" => {
                let mut any = false;
                for clause in branch_clauses("$or", condition)? {
                    if matches_filter(document, clause)? {
                        any = true;
                        break;
                    }
                }
                if !any {
                    return Ok(false);
                }
            }
            path => {
                if !matches_condition(lookup_path(document, path), condition)? {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn branch_clauses<'a>(
    operator: &'static str,
    condition: &'a Bson,
) -> Result<impl Iterator<Item = &'a Document>, MemoryDriverError> {
    let Bson::Array(clauses) = condition else {
        return Err(MemoryDriverError::BadOperatorArgument {
            operator,
            expected: "an array of documents",
        });
    };
    let mut documents = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let Bson::Document(document) = clause else {
            return Err(MemoryDriverError::BadOperatorArgument {
                operator,
                expected: "an array of documents",
            });
        };
        documents.push(document);
    }
    Ok(documents.into_iter())
}

/// Walks a dotted path to the parent document of the leaf key, creating
/// intermediate documents on the way.
fn ensure_parent<'a>(
    document: &'a mut Document,
    path: &'a str,
) -> Result<(&'a mut Document, &'a str), MemoryDriverError> {
    let (head, leaf) = match path.rsplit_once('.') {
        Some((head, leaf)) => (Some(head), leaf),
        None => (None, path),
    };
    let mut current = document;
    if let Some(head) = head {
        for segment in head.split('.') {
            match current.get(segment) {
                Some(Bson::Document(_)) => {}
                Some(_) => {
                    return Err(MemoryDriverError::PathThroughNonDocument(path.to_string()));
                }
                None => {
                    current.insert(segment, Document::new());
                }
            }
            current = match current.get_mut(segment) {
                Some(Bson::Document(inner)) => inner,
                _ => return Err(MemoryDriverError::PathThroughNonDocument(path.to_string())),
            };
        }
    }
    Ok((current, leaf))
}

/// Non-creating variant of [`ensure_parent`]. `None` when the path does
/// not lead through existing documents.
fn existing_parent<'a>(
    document: &'a mut Document,
    path: &'a str,
) -> Option<(&'a mut Document, &'a str)> {
    let (head, leaf) = match path.rsplit_once('.') {
        Some((head, leaf)) => (Some(head), leaf),
        None => (None, path),
    };
    let mut current = document;
    if let Some(head) = head {
        for segment in head.split('.') {
            match current.get_mut(segment) {
                Some(Bson::Document(inner)) => current = inner,
                _ => return None,
            }
        }
    }
    Some((current, leaf))
}

fn numeric_add(current: &Bson, delta: &Bson, field: &str) -> Result<Bson, MemoryDriverError> {
    let err = || MemoryDriverError::NonNumericTarget {
        operator: "$inc",
        field: field.to_string(),
    };
    Ok(match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a) + b),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a + i64::from(*b)),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a + b),
        (Bson::Double(a), _) => Bson::Double(a + as_f64(delta).ok_or_else(err)?),
        (_, Bson::Double(b)) => Bson::Double(as_f64(current).ok_or_else(err)? + b),
        _ => return Err(err()),
    })
}

fn numeric_mul(current: &Bson, factor: &Bson, field: &str) -> Result<Bson, MemoryDriverError> {
    let err = || MemoryDriverError::NonNumericTarget {
        operator: "$mul",
        field: field.to_string(),
    };
    Ok(match (current, factor) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_mul(*b) {
            Some(product) => Bson::Int32(product),
            None => Bson::Int64(i64::from(*a) * i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a) * b),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a * i64::from(*b)),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a * b),
        (Bson::Double(a), _) => Bson::Double(a * as_f64(factor).ok_or_else(err)?),
        (_, Bson::Double(b)) => Bson::Double(as_f64(current).ok_or_else(err)? * b),
        _ => return Err(err()),
    })
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Zero of the factor's numeric type, for `$mul` on a missing field.
fn zero_like(factor: &Bson) -> Bson {
    match factor {
        Bson::Int32(_) => Bson::Int32(0),
        Bson::Int64(_) => Bson::Int64(0),
        _ => Bson::Double(0.0),
    }
}

fn array_target<'a>(
    parent: &'a mut Document,
    leaf: &str,
    operator: &'static str,
    path: &str,
) -> Result<Option<&'a mut Vec<Bson>>, MemoryDriverError> {
    match parent.get_mut(leaf) {
        Some(Bson::Array(elements)) => Ok(Some(elements)),
        Some(_) => Err(MemoryDriverError::NonArrayTarget {
            operator,
            field: path.to_string(),
        }),
        None => Ok(None),
    }
}

/// Applies an update document to `document` in place.
///
/// `$setOnInsert` is accepted and skipped: it only takes effect when an
/// upsert inserts, which is handled at the insert site.
pub fn apply_update(
    document: &mut Document,
    update: &Document,
) -> Result<(), MemoryDriverError> {
    for (operator, payload) in update {
        if operator == "$setOnInsert" {
            continue;
        }
        let Bson::Document(payload) = payload else {
            return Err(MemoryDriverError::BadUpdatePayload(operator.clone()));
        };
        for (path, argument) in payload {
            match operator.as_str() {
                "$set" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    parent.insert(leaf, argument.clone());
                }
                "$unset" => {
                    if let Some((parent, leaf)) = existing_parent(document, path) {
                        parent.remove(leaf);
                    }
                }
                "$inc" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    let next = match parent.get(leaf) {
                        Some(current) => numeric_add(current, argument, path)?,
                        None => argument.clone(),
                    };
                    parent.insert(leaf, next);
                }
                "$mul" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    let next = match parent.get(leaf) {
                        Some(current) => numeric_mul(current, argument, path)?,
                        None => zero_like(argument),
                    };
                    parent.insert(leaf, next);
                }
                "$min" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    let replace = match parent.get(leaf) {
                        Some(current) => {
                            Comparable::from(argument).partial_cmp(&Comparable::from(current))
                                == Some(Ordering::Less)
                        }
                        None => true,
                    };
                    if replace {
                        parent.insert(leaf, argument.clone());
                    }
                }
                "$max" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    let replace = match parent.get(leaf) {
                        Some(current) => {
                            Comparable::from(argument).partial_cmp(&Comparable::from(current))
                                == Some(Ordering::Greater)
                        }
                        None => true,
                    };
                    if replace {
                        parent.insert(leaf, argument.clone());
                    }
                }
                "$push" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    match array_target(parent, leaf, "$push", path)? {
                        Some(elements) => elements.push(argument.clone()),
                        None => {
                            parent.insert(leaf, Bson::Array(vec![argument.clone()]));
                        }
                    }
                }
                "$addToSet" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    match array_target(parent, leaf, "$addToSet", path)? {
                        Some(elements) => {
                            if !elements.iter().any(|element| equals(element, argument)) {
                                elements.push(argument.clone());
                            }
                        }
                        None => {
                            parent.insert(leaf, Bson::Array(vec![argument.clone()]));
                        }
                    }
                }
                "$pull" => {
                    if let Some((parent, leaf)) = existing_parent(document, path) {
                        if let Some(elements) = array_target(parent, leaf, "$pull", path)? {
                            let mut kept = Vec::with_capacity(elements.len());
                            for element in elements.drain(..) {
                                if !matches_condition(Some(&element), argument)? {
                                    kept.push(element);
                                }
                            }
                            *elements = kept;
                        }
                    }
                }
                "$pullAll" => {
                    let Bson::Array(values) = argument else {
                        return Err(MemoryDriverError::BadOperatorArgument {
                            operator: "$pullAll",
                            expected: "an array",
                        });
                    };
                    if let Some((parent, leaf)) = existing_parent(document, path) {
                        if let Some(elements) = array_target(parent, leaf, "$pullAll", path)? {
                            elements
                                .retain(|element| !values.iter().any(|value| equals(element, value)));
                        }
                    }
                }
                "$pop" => {
                    let from_front = matches!(argument, Bson::Int32(-1) | Bson::Int64(-1));
                    if let Some((parent, leaf)) = existing_parent(document, path) {
                        if let Some(elements) = array_target(parent, leaf, "$pop", path)? {
                            if !elements.is_empty() {
                                if from_front {
                                    elements.remove(0);
                                } else {
                                    elements.pop();
                                }
                            }
                        }
                    }
                }
                "$rename" => {
                    let Bson::String(target) = argument else {
                        return Err(MemoryDriverError::BadOperatorArgument {
                            operator: "$rename",
                            expected: "a string path",
                        });
                    };
                    let moved = existing_parent(document, path)
                        .and_then(|(parent, leaf)| parent.remove(leaf));
                    if let Some(value) = moved {
                        let (parent, leaf) = ensure_parent(document, target)?;
                        parent.insert(leaf, value);
                    }
                }
                "$currentDate" => {
                    let (parent, leaf) = ensure_parent(document, path)?;
                    parent.insert(leaf, Bson::DateTime(DateTime::now()));
                }
                other => {
                    return Err(MemoryDriverError::UnsupportedUpdateOperator(
                        other.to_string(),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Multi-key sort per a `{ field: 1 | -1 }` document.
pub fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|a, b| {
        for (field, direction) in sort {
            let left = lookup_path(a, field)
                .map(Comparable::from)
                .unwrap_or(Comparable::Null);
            let right = lookup_path(b, field)
                .map(Comparable::from)
                .unwrap_or(Comparable::Null);
            let ordering = left.partial_cmp(&right).unwrap_or(Ordering::Equal);
            let descending = matches!(direction, Bson::Int32(d) if *d < 0)
                || matches!(direction, Bson::Int64(d) if *d < 0)
                || matches!(direction, Bson::Double(d) if *d < 0.0);
            let ordering = if descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
