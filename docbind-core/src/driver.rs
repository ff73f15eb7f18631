//! Driver abstraction for document databases.
//!
//! This module defines the contract the CRUD layer speaks to an underlying
//! database driver. Two trait variants cover the two call shapes:
//!
//! - [`Driver`]: blocking operations, cursors are [`Iterator`]s
//! - [`AsyncDriver`]: suspension-capable operations, cursors are [`Stream`]s
//!
//! Both variants expose the same six per-collection operations on raw
//! [`Document`]s; all typed conversion happens above this layer. Adapters
//! implement whichever variant their driver supports (or both, as the
//! in-memory driver does).
//!
//! # Error Handling
//!
//! Every operation returns `Result<_, DriverError>`. Adapters box their
//! driver's own error unchanged; see [`DriverError`].
//!
//! # Examples
//!
//! ```ignore
//! use docbind::driver::{Driver, FindOptions};
//! use bson::doc;
//!
//! let cursor = driver.find(
//!     "users",
//!     doc! { "age": { "$gte": 18 } },
//!     FindOptions::new().sort(doc! { "name": 1 }).limit(10),
//! )?;
//! for document in cursor {
//!     println!("{:?}", document?);
//! }
//! # Ok::<(), docbind::error::DriverError>(())
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Options for a `find` operation, passed to the driver verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Sort specification, e.g. `doc! { "name": 1, "age": -1 }`. Keys are
    /// field names, values are `1` (ascending) or `-1` (descending).
    pub sort: Option<Document>,
}

impl FindOptions {
    /// Creates empty options: no skip, no limit, store order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the first `skip` matching documents.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Returns at most `limit` documents.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts results by the given specification before skip/limit apply.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Outcome of an `insert_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    /// The identity of the inserted document, whether caller-supplied or
    /// store-generated.
    pub inserted_id: Bson,
}

/// Outcome of an `update_one` or `replace_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Number of documents the filter matched.
    pub matched_count: u64,
    /// Number of documents actually modified.
    pub modified_count: u64,
    /// Identity of the document inserted by an upsert, if one happened.
    pub upserted_id: Option<Bson>,
}

/// Outcome of a `delete_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Number of documents deleted (0 or 1).
    pub deleted_count: u64,
}

/// Blocking driver contract.
///
/// Implementations must be thread-safe; the exact concurrency model is
/// adapter-specific. Collections are addressed by name and created on first
/// use where the underlying store supports that.
pub trait Driver: Send + Sync + Debug {
    /// Cursor type returned by [`find`](Driver::find). Consume-once: a
    /// single forward pass over the results.
    type Cursor: Iterator<Item = Result<Document, DriverError>>;

    /// Inserts one document into a collection.
    ///
    /// # Returns
    ///
    /// The identity of the inserted document. When the document carries no
    /// identity the store assigns one and returns it here.
    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError>;

    /// Finds the first document matching `filter`, or `None`.
    fn find_one(&self, collection: &str, filter: Document)
    -> Result<Option<Document>, DriverError>;

    /// Finds all documents matching `filter`, honoring `options`.
    ///
    /// # Returns
    ///
    /// A consume-once cursor over the matching documents. Errors may
    /// surface per yielded item.
    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError>;

    /// Applies an update document (`$set`, `$inc`, ...) to the first
    /// document matching `filter`.
    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError>;

    /// Replaces the first document matching `filter` wholesale.
    ///
    /// # Arguments
    ///
    /// * `upsert` - When true and nothing matches, insert `replacement`
    ///   instead.
    fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError>;

    /// Deletes the first document matching `filter`.
    fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteResult, DriverError>;
}

/// Suspension-capable driver contract. The async twin of [`Driver`]; the
/// operations and their semantics are identical.
#[async_trait]
pub trait AsyncDriver: Send + Sync + Debug {
    /// Cursor type returned by [`find`](AsyncDriver::find). Consume-once.
    type Cursor: Stream<Item = Result<Document, DriverError>> + Send + Unpin;

    /// Inserts one document into a collection.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError>;

    /// Finds the first document matching `filter`, or `None`.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError>;

    /// Finds all documents matching `filter`, honoring `options`.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError>;

    /// Applies an update document to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError>;

    /// Replaces the first document matching `filter` wholesale, inserting
    /// it when `upsert` is true and nothing matches.
    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError>;

    /// Deletes the first document matching `filter`.
    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteResult, DriverError>;
}

impl<D> Driver for &D
where
    D: Driver,
{
    type Cursor = D::Cursor;

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        (*self).insert_one(collection, document)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        (*self).find_one(collection, filter)
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        (*self).find(collection, filter, options)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        (*self).update_one(collection, filter, update)
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        (*self).replace_one(collection, filter, replacement, upsert)
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteResult, DriverError> {
        (*self).delete_one(collection, filter)
    }
}

impl<D> Driver for &mut D
where
    D: Driver,
{
    type Cursor = D::Cursor;

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        (**self).insert_one(collection, document)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        (**self).find_one(collection, filter)
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        (**self).find(collection, filter, options)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        (**self).update_one(collection, filter, update)
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        (**self).replace_one(collection, filter, replacement, upsert)
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteResult, DriverError> {
        (**self).delete_one(collection, filter)
    }
}

#[async_trait]
impl<D> AsyncDriver for &D
where
    D: AsyncDriver,
{
    type Cursor = D::Cursor;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        (*self).insert_one(collection, document).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        (*self).find_one(collection, filter).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        (*self).find(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        (*self).update_one(collection, filter, update).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        (*self)
            .replace_one(collection, filter, replacement, upsert)
            .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteResult, DriverError> {
        (*self).delete_one(collection, filter).await
    }
}

#[async_trait]
impl<D> AsyncDriver for &mut D
where
    D: AsyncDriver,
{
    type Cursor = D::Cursor;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        (**self).insert_one(collection, document).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        (**self).find_one(collection, filter).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        (**self).find(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        (**self).update_one(collection, filter, update).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        (**self)
            .replace_one(collection, filter, replacement, upsert)
            .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteResult, DriverError> {
        (**self).delete_one(collection, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_options_chain() {
        let options = FindOptions::new()
            .skip(5)
            .limit(10)
            .sort(bson::doc! { "name": 1 });
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.sort, Some(bson::doc! { "name": 1 }));
    }

    #[test]
    fn find_options_default_is_empty() {
        let options = FindOptions::new();
        assert_eq!(options, FindOptions::default());
        assert!(options.skip.is_none());
        assert!(options.limit.is_none());
        assert!(options.sort.is_none());
    }
}
