//! Typed CRUD dispatch for entity types.
//!
//! A repository binds one [`Entity`] type to one driver and dispatches
//! single-shot operations through the conversion layer:
//!
//! - [`Repository`]: blocking operations over a [`Driver`]
//! - [`AsyncRepository`]: suspension-capable operations over an
//!   [`AsyncDriver`]
//!
//! Repositories are obtained from a [`Datastore`](crate::store::Datastore)
//! or [`AsyncDatastore`](crate::store::AsyncDatastore) and are cheap,
//! short-lived handles; nothing is cached in them.
//!
//! # Guard
//!
//! Every operation first checks the entity registry: the type must be
//! registered and its declaration valid. A failed guard raises
//! [`TypeMismatch`](crate::error::OdmError::TypeMismatch) (or
//! [`Configuration`](crate::error::OdmError::Configuration) for a
//! contradictory declaration) before the driver is touched at all.
//!
//! # Example
//!
//! ```ignore
//! use docbind::prelude::*;
//! use bson::doc;
//!
//! #[derive(Debug, Record, Entity)]
//! struct User {
//!     #[record(rename = "_id")]
//!     id: Option<bson::oid::ObjectId>,
//!     name: String,
//! }
//!
//! let store = Datastore::new(driver);
//! let users = store.repository::<User>();
//!
//! let mut user = User { id: None, name: "Alice".into() };
//! users.insert_one(&mut user)?;
//! assert!(user.id.is_some());
//!
//! let found = users.find_one(doc! { "name": "Alice" })?;
//! # Ok::<(), docbind::error::OdmError>(())
//! ```

use std::marker::PhantomData;

use bson::{Bson, Document};

use crate::cursor::{AsyncCursor, Cursor};
use crate::document::DecodeOptions;
use crate::driver::{
    AsyncDriver, DeleteResult, Driver, FindOptions, InsertOneResult, UpdateResult,
};
use crate::entity::{self, Entity, ID_FIELD};
use crate::error::OdmResult;
use crate::update;

fn identity_filter<E: Entity>(entity: &E) -> OdmResult<Document> {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, entity::get_id(entity)?);
    Ok(filter)
}

/// Blocking repository for one entity type.
#[derive(Debug)]
pub struct Repository<'a, D: Driver, E: Entity> {
    driver: &'a D,
    decode: DecodeOptions,
    _marker: PhantomData<E>,
}

impl<'a, D: Driver, E: Entity> Repository<'a, D, E> {
    pub(crate) fn new(driver: &'a D) -> Self {
        Self {
            driver,
            decode: DecodeOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Replaces the decode options used when reading documents back.
    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode = options;
        self
    }

    /// Inserts the entity into its collection.
    ///
    /// A null identity is stripped from the submitted document so the
    /// store assigns a key; the returned key is written back onto the
    /// entity before this returns.
    ///
    /// # Errors
    ///
    /// [`TypeMismatch`](crate::error::OdmError::TypeMismatch) when `E` is
    /// not a registered entity;
    /// [`Conversion`](crate::error::OdmError::Conversion) when a field
    /// fails to serialize;
    /// [`Driver`](crate::error::OdmError::Driver) for store failures.
    pub fn insert_one(&self, entity: &mut E) -> OdmResult<InsertOneResult> {
        let meta = entity::require::<E>()?;
        let mut document = entity.to_document()?;
        if entity::get_id(entity)? == Bson::Null {
            document.remove(ID_FIELD);
        }
        let result = self.driver.insert_one(meta.collection(), document)?;
        entity::set_id(entity, result.inserted_id.clone())?;
        Ok(result)
    }

    /// Finds the first entity matching `filter`, or `None`.
    pub fn find_one(&self, filter: Document) -> OdmResult<Option<E>> {
        let meta = entity::require::<E>()?;
        match self.driver.find_one(meta.collection(), filter)? {
            Some(document) => Ok(Some(E::from_document_with(document, &self.decode)?)),
            None => Ok(None),
        }
    }

    /// Finds all entities matching `filter`.
    ///
    /// Returns a consume-once [`Cursor`]; filter and options pass to the
    /// driver verbatim, each yielded document is decoded as it arrives.
    pub fn find(&self, filter: Document, options: FindOptions) -> OdmResult<Cursor<D::Cursor, E>> {
        let meta = entity::require::<E>()?;
        let cursor = self.driver.find(meta.collection(), filter, options)?;
        Ok(Cursor::new(cursor, self.decode))
    }

    /// Applies an update document to the stored document with this
    /// entity's identity.
    ///
    /// The update passes to the driver verbatim; the [`update`] module has
    /// constructors for the common operators.
    pub fn update_one(&self, entity: &E, update: Document) -> OdmResult<UpdateResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        Ok(self.driver.update_one(meta.collection(), filter, update)?)
    }

    /// Updates only the named fields of the stored document.
    ///
    /// Serializes just those fields into a `$set` (nested documents
    /// flatten to dotted paths) and dispatches it keyed by identity.
    pub fn update_fields(&self, entity: &E, fields: &[&str]) -> OdmResult<UpdateResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        let update = update::set_fields(entity, fields)?;
        Ok(self.driver.update_one(meta.collection(), filter, update)?)
    }

    /// Replaces the stored document with this entity's identity wholesale.
    ///
    /// # Arguments
    ///
    /// * `upsert` - When true and no document matches, insert instead. An
    ///   unsaved entity (null identity) matches nothing; what a null key
    ///   upsert does is driver-defined.
    pub fn replace_one(&self, entity: &E, upsert: bool) -> OdmResult<UpdateResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        let replacement = entity.to_document()?;
        Ok(self
            .driver
            .replace_one(meta.collection(), filter, replacement, upsert)?)
    }

    /// Deletes the stored document with this entity's identity.
    pub fn delete_one(&self, entity: &E) -> OdmResult<DeleteResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        Ok(self.driver.delete_one(meta.collection(), filter)?)
    }
}

/// Suspension-capable repository for one entity type. The async twin of
/// [`Repository`]; operation semantics are identical.
#[derive(Debug)]
pub struct AsyncRepository<'a, D: AsyncDriver, E: Entity> {
    driver: &'a D,
    decode: DecodeOptions,
    _marker: PhantomData<E>,
}

impl<'a, D: AsyncDriver, E: Entity> AsyncRepository<'a, D, E> {
    pub(crate) fn new(driver: &'a D) -> Self {
        Self {
            driver,
            decode: DecodeOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Replaces the decode options used when reading documents back.
    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode = options;
        self
    }

    /// Inserts the entity into its collection.
    ///
    /// A null identity is stripped from the submitted document so the
    /// store assigns a key; the returned key is written back onto the
    /// entity before this returns.
    ///
    /// # Cancellation
    ///
    /// If the future is dropped mid-flight the insert may or may not have
    /// reached the store, and the identity write-back may not have
    /// happened. The ambiguity is inherent to cancelling a submitted
    /// operation; nothing is rolled back.
    pub async fn insert_one(&self, entity: &mut E) -> OdmResult<InsertOneResult> {
        let meta = entity::require::<E>()?;
        let mut document = entity.to_document()?;
        if entity::get_id(entity)? == Bson::Null {
            document.remove(ID_FIELD);
        }
        let result = self.driver.insert_one(meta.collection(), document).await?;
        entity::set_id(entity, result.inserted_id.clone())?;
        Ok(result)
    }

    /// Finds the first entity matching `filter`, or `None`.
    pub async fn find_one(&self, filter: Document) -> OdmResult<Option<E>> {
        let meta = entity::require::<E>()?;
        match self.driver.find_one(meta.collection(), filter).await? {
            Some(document) => Ok(Some(E::from_document_with(document, &self.decode)?)),
            None => Ok(None),
        }
    }

    /// Finds all entities matching `filter`.
    ///
    /// Returns a consume-once [`AsyncCursor`]; filter and options pass to
    /// the driver verbatim, each yielded document is decoded as it
    /// arrives.
    pub async fn find(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> OdmResult<AsyncCursor<D::Cursor, E>> {
        let meta = entity::require::<E>()?;
        let cursor = self.driver.find(meta.collection(), filter, options).await?;
        Ok(AsyncCursor::new(cursor, self.decode))
    }

    /// Applies an update document to the stored document with this
    /// entity's identity.
    pub async fn update_one(&self, entity: &E, update: Document) -> OdmResult<UpdateResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        Ok(self
            .driver
            .update_one(meta.collection(), filter, update)
            .await?)
    }

    /// Updates only the named fields of the stored document.
    pub async fn update_fields(&self, entity: &E, fields: &[&str]) -> OdmResult<UpdateResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        let update = update::set_fields(entity, fields)?;
        Ok(self
            .driver
            .update_one(meta.collection(), filter, update)
            .await?)
    }

    /// Replaces the stored document with this entity's identity wholesale,
    /// inserting it when `upsert` is true and nothing matches.
    pub async fn replace_one(&self, entity: &E, upsert: bool) -> OdmResult<UpdateResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        let replacement = entity.to_document()?;
        Ok(self
            .driver
            .replace_one(meta.collection(), filter, replacement, upsert)
            .await?)
    }

    /// Deletes the stored document with this entity's identity.
    pub async fn delete_one(&self, entity: &E) -> OdmResult<DeleteResult> {
        let meta = entity::require::<E>()?;
        let filter = identity_filter(entity)?;
        Ok(self.driver.delete_one(meta.collection(), filter).await?)
    }
}
