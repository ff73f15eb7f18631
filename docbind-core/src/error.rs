//! Error and result types for mapping operations.
//!
//! This module defines the error taxonomy for the whole crate. Use
//! [`OdmResult<T>`] as the return type for fallible operations.

use bson::Bson;
use thiserror::Error;

/// Represents all possible errors raised by the mapping layer.
///
/// The variants separate caller mistakes ([`TypeMismatch`](OdmError::TypeMismatch),
/// [`Configuration`](OdmError::Configuration)) from data-shape problems
/// ([`MissingField`](OdmError::MissingField), [`Conversion`](OdmError::Conversion))
/// and from store-level failures ([`Driver`](OdmError::Driver)), which pass
/// through untouched.
#[derive(Error, Debug)]
pub enum OdmError {
    /// A value failed its type contract: a non-entity type where an entity
    /// was required, or a record with no identity field. Raised before any
    /// driver call.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Strict-mode decoding encountered a field with no value in the
    /// document and no declared default.
    #[error("missing field `{field}` on `{record}`")]
    MissingField {
        /// Name of the record type being decoded.
        record: &'static str,
        /// Declared name of the missing field.
        field: &'static str,
    },
    /// A value could not be converted to or from its BSON representation.
    #[error("conversion error: {0}")]
    Conversion(String),
    /// An entity declaration is self-contradictory, e.g. two fields resolve
    /// to the same external name or two fields claim the identity role.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// An error raised by the underlying driver, passed through unchanged.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl OdmError {
    /// Builds a [`Conversion`](OdmError::Conversion) error describing a BSON
    /// value that cannot become `expected`.
    pub fn conversion(expected: &str, value: &Bson) -> Self {
        OdmError::Conversion(format!(
            "cannot convert BSON {:?} into `{}`",
            value.element_type(),
            expected
        ))
    }
}

/// A specialized `Result` type for mapping operations.
///
/// This type alias is used throughout the crate to indicate operations that
/// may fail with an [`OdmError`].
pub type OdmResult<T> = Result<T, OdmError>;

/// An opaque error produced by a driver implementation.
///
/// The mapping layer has no opinion on store-level failure semantics, so
/// driver errors are boxed as-is rather than reworded. The original error
/// stays reachable through [`source`](std::error::Error::source) and
/// [`inner`](DriverError::inner) for downcasting.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DriverError(#[source] Box<dyn std::error::Error + Send + Sync + 'static>);

impl DriverError {
    /// Wraps a concrete driver error.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        DriverError(err.into())
    }

    /// Returns the wrapped error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }

    /// Consumes the wrapper and returns the boxed error.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }
}
