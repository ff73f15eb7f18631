//! Bidirectional conversion between native values and BSON.
//!
//! This module defines the [`ToBson`]/[`FromBson`] trait pair and implements
//! it for primitives, containers, and the semantic types a document store
//! speaks natively (timestamps, decimals, identifiers, patterns, binary
//! blobs). Record types get their implementations from `#[derive(Record)]`.
//!
//! The deserialize half of each implementation accepts every representation
//! the wire format can legally carry for that type. A [`bson::DateTime`],
//! for example, decodes from a native BSON datetime, an ISO-8601 string, or
//! a numeric epoch offset. Anything outside the accepted set fails with
//! [`OdmError::Conversion`].
//!
//! All implementations are fixed at compile time; there is no runtime
//! registration and no shared mutable converter state. Per-call behavior
//! (such as the missing-field policy) travels in
//! [`DecodeOptions`](crate::document::DecodeOptions), threaded through
//! [`FromBson::from_bson_with`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, DateTime, Decimal128, Document, Regex};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::document::DecodeOptions;
use crate::error::{OdmError, OdmResult};

/// Serializes a value into its BSON representation.
///
/// Total for primitives and containers of convertible elements; fails with
/// [`OdmError::Conversion`] only when a value cannot be represented (e.g. an
/// unsigned integer above the signed 64-bit range).
pub trait ToBson {
    /// Converts `self` into a [`Bson`] value.
    fn to_bson(&self) -> OdmResult<Bson>;
}

/// Deserializes a value from its BSON representation.
///
/// Implementations must accept every wire shape the store can produce for
/// the target type and reject everything else with
/// [`OdmError::Conversion`].
pub trait FromBson: Sized {
    /// Converts a [`Bson`] value into `Self`.
    fn from_bson(value: Bson) -> OdmResult<Self>;

    /// Like [`from_bson`](FromBson::from_bson), with explicit decode
    /// options.
    ///
    /// The default implementation ignores the options; containers and
    /// record types override it to thread the options through to nested
    /// values.
    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        let _ = options;
        Self::from_bson(value)
    }
}

impl<T: ToBson + ?Sized> ToBson for &T {
    fn to_bson(&self) -> OdmResult<Bson> {
        (**self).to_bson()
    }
}

impl<T: ToBson> ToBson for Box<T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        (**self).to_bson()
    }
}

impl<T: FromBson> FromBson for Box<T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        T::from_bson_with(value, options).map(Box::new)
    }
}

impl ToBson for Bson {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(self.clone())
    }
}

impl FromBson for Bson {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Ok(value)
    }
}

impl ToBson for bool {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Boolean(*self))
    }
}

impl FromBson for bool {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Boolean(b) => Ok(b),
            other => Err(OdmError::conversion("bool", &other)),
        }
    }
}

impl ToBson for i32 {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Int32(*self))
    }
}

impl FromBson for i32 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Int32(n) => Ok(n),
            Bson::Int64(n) => {
                i32::try_from(n).map_err(|_| OdmError::conversion("i32", &Bson::Int64(n)))
            }
            other => Err(OdmError::conversion("i32", &other)),
        }
    }
}

impl ToBson for i64 {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Int64(*self))
    }
}

impl FromBson for i64 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Int64(n) => Ok(n),
            Bson::Int32(n) => Ok(i64::from(n)),
            other => Err(OdmError::conversion("i64", &other)),
        }
    }
}

impl ToBson for u32 {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Int64(i64::from(*self)))
    }
}

impl FromBson for u32 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        let wide = i64::from_bson(value)?;
        u32::try_from(wide).map_err(|_| OdmError::conversion("u32", &Bson::Int64(wide)))
    }
}

impl ToBson for u64 {
    fn to_bson(&self) -> OdmResult<Bson> {
        i64::try_from(*self)
            .map(Bson::Int64)
            .map_err(|_| OdmError::Conversion(format!("u64 value {} exceeds the BSON integer range", self)))
    }
}

impl FromBson for u64 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        let wide = i64::from_bson(value)?;
        u64::try_from(wide).map_err(|_| OdmError::conversion("u64", &Bson::Int64(wide)))
    }
}

impl ToBson for f64 {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Double(*self))
    }
}

impl FromBson for f64 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Double(f) => Ok(f),
            Bson::Int32(n) => Ok(f64::from(n)),
            Bson::Int64(n) => Ok(n as f64),
            other => Err(OdmError::conversion("f64", &other)),
        }
    }
}

impl ToBson for f32 {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Double(f64::from(*self)))
    }
}

impl FromBson for f32 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        f64::from_bson(value).map(|f| f as f32)
    }
}

impl ToBson for String {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::String(self.clone()))
    }
}

impl FromBson for String {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::String(s) => Ok(s),
            other => Err(OdmError::conversion("String", &other)),
        }
    }
}

impl ToBson for str {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::String(self.to_owned()))
    }
}

impl<T: ToBson> ToBson for Option<T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        match self {
            Some(value) => value.to_bson(),
            None => Ok(Bson::Null),
        }
    }
}

impl<T: FromBson> FromBson for Option<T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        match value {
            Bson::Null => Ok(None),
            other => T::from_bson_with(other, options).map(Some),
        }
    }
}

impl<T: ToBson> ToBson for [T] {
    fn to_bson(&self) -> OdmResult<Bson> {
        self.iter()
            .map(ToBson::to_bson)
            .collect::<OdmResult<Vec<Bson>>>()
            .map(Bson::Array)
    }
}

impl<T: ToBson> ToBson for Vec<T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        self.as_slice().to_bson()
    }
}

impl<T: FromBson> FromBson for Vec<T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        match value {
            Bson::Array(items) => items
                .into_iter()
                .map(|item| T::from_bson_with(item, options))
                .collect(),
            other => Err(OdmError::conversion("array", &other)),
        }
    }
}

impl<T: ToBson, const N: usize> ToBson for [T; N] {
    fn to_bson(&self) -> OdmResult<Bson> {
        self.as_slice().to_bson()
    }
}

impl<T: FromBson, const N: usize> FromBson for [T; N] {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        let items = Vec::<T>::from_bson_with(value, options)?;
        let len = items.len();
        items.try_into().map_err(|_| {
            OdmError::Conversion(format!("expected an array of length {}, got {}", N, len))
        })
    }
}

// Hash sets lose their element order on the way out; they serialize as
// arrays and rehydrate from arrays.
impl<T: ToBson + Eq + Hash> ToBson for HashSet<T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        self.iter()
            .map(ToBson::to_bson)
            .collect::<OdmResult<Vec<Bson>>>()
            .map(Bson::Array)
    }
}

impl<T: FromBson + Eq + Hash> FromBson for HashSet<T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        Vec::<T>::from_bson_with(value, options).map(|items| items.into_iter().collect())
    }
}

impl<T: ToBson + Ord> ToBson for BTreeSet<T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        self.iter()
            .map(ToBson::to_bson)
            .collect::<OdmResult<Vec<Bson>>>()
            .map(Bson::Array)
    }
}

impl<T: FromBson + Ord> FromBson for BTreeSet<T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        Vec::<T>::from_bson_with(value, options).map(|items| items.into_iter().collect())
    }
}

// Tuples flatten to arrays at the boundary and decode positionally.
macro_rules! impl_tuple {
    ($len:literal => $($name:ident : $index:tt),+) => {
        impl<$($name: ToBson),+> ToBson for ($($name,)+) {
            fn to_bson(&self) -> OdmResult<Bson> {
                Ok(Bson::Array(vec![$(self.$index.to_bson()?),+]))
            }
        }

        impl<$($name: FromBson),+> FromBson for ($($name,)+) {
            fn from_bson(value: Bson) -> OdmResult<Self> {
                Self::from_bson_with(value, &DecodeOptions::default())
            }

            fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
                match value {
                    Bson::Array(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($(
                            $name::from_bson_with(
                                items.next().unwrap_or(Bson::Null),
                                options,
                            )?,
                        )+))
                    }
                    Bson::Array(items) => Err(OdmError::Conversion(format!(
                        "expected an array of length {}, got {}",
                        $len,
                        items.len()
                    ))),
                    other => Err(OdmError::conversion("array", &other)),
                }
            }
        }
    };
}

impl_tuple!(2 => A: 0, B: 1);
impl_tuple!(3 => A: 0, B: 1, C: 2);
impl_tuple!(4 => A: 0, B: 1, C: 2, D: 3);

impl<T: ToBson> ToBson for HashMap<String, T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        let mut doc = Document::new();
        for (key, value) in self {
            doc.insert(key.clone(), value.to_bson()?);
        }
        Ok(Bson::Document(doc))
    }
}

impl<T: FromBson> FromBson for HashMap<String, T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        match value {
            Bson::Document(doc) => doc
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_bson_with(value, options)?)))
                .collect(),
            other => Err(OdmError::conversion("document", &other)),
        }
    }
}

impl<T: ToBson> ToBson for BTreeMap<String, T> {
    fn to_bson(&self) -> OdmResult<Bson> {
        let mut doc = Document::new();
        for (key, value) in self {
            doc.insert(key.clone(), value.to_bson()?);
        }
        Ok(Bson::Document(doc))
    }
}

impl<T: FromBson> FromBson for BTreeMap<String, T> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        Self::from_bson_with(value, &DecodeOptions::default())
    }

    fn from_bson_with(value: Bson, options: &DecodeOptions) -> OdmResult<Self> {
        match value {
            Bson::Document(doc) => doc
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_bson_with(value, options)?)))
                .collect(),
            other => Err(OdmError::conversion("document", &other)),
        }
    }
}

/// Documents are the ordered key-value form; they pass through as-is.
impl ToBson for Document {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Document(self.clone()))
    }
}

impl FromBson for Document {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Document(doc) => Ok(doc),
            other => Err(OdmError::conversion("document", &other)),
        }
    }
}

impl ToBson for ObjectId {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::ObjectId(*self))
    }
}

impl FromBson for ObjectId {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::ObjectId(oid) => Ok(oid),
            Bson::String(s) => ObjectId::parse_str(&s)
                .map_err(|err| OdmError::Conversion(format!("invalid ObjectId string: {err}"))),
            other => Err(OdmError::conversion("ObjectId", &other)),
        }
    }
}

impl ToBson for DateTime {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::DateTime(*self))
    }
}

/// Accepts the native millisecond datetime, an ISO-8601 string, integer
/// epoch seconds, or fractional epoch seconds as a double.
impl FromBson for DateTime {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::DateTime(dt) => Ok(dt),
            Bson::String(s) => parse_datetime_str(&s),
            Bson::Int32(secs) => epoch_seconds_to_datetime(i64::from(secs)),
            Bson::Int64(secs) => epoch_seconds_to_datetime(secs),
            Bson::Double(secs) => {
                if secs.is_finite() {
                    Ok(DateTime::from_millis((secs * 1000.0) as i64))
                } else {
                    Err(OdmError::Conversion(format!(
                        "non-finite epoch offset {secs} is not a datetime"
                    )))
                }
            }
            other => Err(OdmError::conversion("DateTime", &other)),
        }
    }
}

fn parse_datetime_str(s: &str) -> OdmResult<DateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(DateTime::from_chrono(dt.with_timezone(&Utc)));
    }
    // Zone-less timestamps are read as UTC.
    s.parse::<NaiveDateTime>()
        .map(|naive| DateTime::from_chrono(naive.and_utc()))
        .map_err(|err| OdmError::Conversion(format!("invalid datetime string `{s}`: {err}")))
}

fn epoch_seconds_to_datetime(secs: i64) -> OdmResult<DateTime> {
    secs.checked_mul(1000)
        .map(DateTime::from_millis)
        .ok_or_else(|| OdmError::Conversion(format!("epoch offset {secs}s overflows the datetime range")))
}

impl ToBson for chrono::DateTime<Utc> {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::DateTime(DateTime::from_chrono(*self)))
    }
}

impl FromBson for chrono::DateTime<Utc> {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        DateTime::from_bson(value).map(|dt| dt.to_chrono())
    }
}

/// Calendar dates are stored as midnight UTC datetimes.
impl ToBson for NaiveDate {
    fn to_bson(&self) -> OdmResult<Bson> {
        let midnight = self.and_time(NaiveTime::MIN).and_utc();
        Ok(Bson::DateTime(DateTime::from_chrono(midnight)))
    }
}

impl FromBson for NaiveDate {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        if let Bson::String(s) = &value {
            if let Ok(date) = s.parse::<NaiveDate>() {
                return Ok(date);
            }
        }
        DateTime::from_bson(value).map(|dt| dt.to_chrono().date_naive())
    }
}

impl ToBson for Decimal128 {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Decimal128(*self))
    }
}

/// Accepts a native decimal, a decimal string, or a numeric value.
impl FromBson for Decimal128 {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        let text = match value {
            Bson::Decimal128(dec) => return Ok(dec),
            Bson::String(s) => s,
            Bson::Int32(n) => n.to_string(),
            Bson::Int64(n) => n.to_string(),
            Bson::Double(f) => f.to_string(),
            other => return Err(OdmError::conversion("Decimal128", &other)),
        };
        text.parse::<Decimal128>()
            .map_err(|err| OdmError::Conversion(format!("invalid decimal `{text}`: {err}")))
    }
}

impl ToBson for Binary {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::Binary(self.clone()))
    }
}

impl FromBson for Binary {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Binary(bin) => Ok(bin),
            other => Err(OdmError::conversion("Binary", &other)),
        }
    }
}

impl ToBson for Regex {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::RegularExpression(self.clone()))
    }
}

/// Accepts a native regular expression or a bare pattern string.
impl FromBson for Regex {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::RegularExpression(regex) => Ok(regex),
            Bson::String(pattern) => Ok(Regex {
                pattern: pattern.try_into().map_err(|err| {
                    OdmError::Conversion(format!("invalid regex pattern: {err}"))
                })?,
                options: bson::raw::cstr!("").into(),
            }),
            other => Err(OdmError::conversion("Regex", &other)),
        }
    }
}

impl ToBson for bson::Uuid {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(Bson::from(*self))
    }
}

/// Accepts UUID-subtype binary data or a hyphenated string.
impl FromBson for bson::Uuid {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        match value {
            Bson::Binary(bin) if bin.subtype == BinarySubtype::Uuid => {
                let bytes: [u8; 16] = bin.bytes.as_slice().try_into().map_err(|_| {
                    OdmError::Conversion(format!(
                        "UUID binary must hold 16 bytes, got {}",
                        bin.bytes.len()
                    ))
                })?;
                Ok(bson::Uuid::from_bytes(bytes))
            }
            Bson::String(s) => bson::Uuid::parse_str(&s)
                .map_err(|err| OdmError::Conversion(format!("invalid UUID string: {err}"))),
            other => Err(OdmError::conversion("Uuid", &other)),
        }
    }
}

impl ToBson for uuid::Uuid {
    fn to_bson(&self) -> OdmResult<Bson> {
        bson::Uuid::from_bytes(self.into_bytes()).to_bson()
    }
}

impl FromBson for uuid::Uuid {
    fn from_bson(value: Bson) -> OdmResult<Self> {
        bson::Uuid::from_bson(value).map(|u| uuid::Uuid::from_bytes(u.bytes()))
    }
}
