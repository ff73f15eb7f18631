//! The in-memory driver and its cursor.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use docbind_core::driver::{
    AsyncDriver, DeleteResult, Driver, FindOptions, InsertOneResult, UpdateResult,
};
use docbind_core::entity::ID_FIELD;
use docbind_core::error::DriverError;
use futures::Stream;
use parking_lot::RwLock;

use crate::matcher::{self, apply_update, matches_filter, sort_documents};

/// Errors produced by the in-memory driver.
///
/// These surface through [`DriverError`] at the driver boundary; downcast
/// the boxed source when a test needs to inspect the concrete cause.
#[derive(Debug, thiserror::Error)]
pub enum MemoryDriverError {
    /// A document with the same `_id` already exists in the collection.
    #[error("duplicate _id {id:?} in collection `{collection}`")]
    DuplicateKey { collection: String, id: Bson },
    /// A replacement document tried to change the stored `_id`.
    #[error("the _id field is immutable")]
    ImmutableId,
    /// A filter used an operator this driver does not implement.
    #[error("unsupported filter operator `{0}`")]
    UnsupportedFilterOperator(String),
    /// An update used an operator this driver does not implement.
    #[error("unsupported update operator `{0}`")]
    UnsupportedUpdateOperator(String),
    /// An operator argument had the wrong shape.
    #[error("`{operator}` expects {expected}")]
    BadOperatorArgument {
        operator: &'static str,
        expected: &'static str,
    },
    /// The value under an update operator was not a document of field paths.
    #[error("`{0}` expects a document of field paths")]
    BadUpdatePayload(String),
    /// An arithmetic operator targeted a non-numeric field.
    #[error("`{operator}` target `{field}` is not numeric")]
    NonNumericTarget {
        operator: &'static str,
        field: String,
    },
    /// An array operator targeted a non-array field.
    #[error("`{operator}` target `{field}` is not an array")]
    NonArrayTarget {
        operator: &'static str,
        field: String,
    },
    /// A dotted path ran through a value that is not a document.
    #[error("path `{0}` runs through a non-document value")]
    PathThroughNonDocument(String),
}

impl From<MemoryDriverError> for DriverError {
    fn from(err: MemoryDriverError) -> Self {
        DriverError::new(err)
    }
}

/// A process-local driver backed by a map of collection name to documents.
///
/// Implements both [`Driver`] and [`AsyncDriver`], honoring the same
/// filter and update documents a real database would, without any I/O.
///
/// # Thread Safety
///
/// `MemoryDriver` is cloneable and wraps its state in an `Arc`, so it can
/// be shared freely across threads and async tasks. Clones of the same
/// instance share the same underlying collections.
///
/// # Performance
///
/// Every operation scans the target collection (no indexing). That is
/// fine for the test suites and prototypes this driver exists for; use a
/// real database driver for anything with volume.
///
/// # Example
///
/// ```ignore
/// use docbind_core::store::Datastore;
/// use docbind_memory::MemoryDriver;
///
/// let store = Datastore::new(MemoryDriver::new());
/// let people = store.repository::<Person>();
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryDriver {
    /// collection name -> stored documents, in insertion order
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryDriver {
    /// Creates an empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the collections that have received at least one write,
    /// sorted for stable output.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops every collection.
    pub fn clear(&self) {
        self.collections.write().clear();
    }

    fn do_insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<InsertOneResult, MemoryDriverError> {
        let mut collections = self.collections.write();
        let documents = collections.entry(collection.to_string()).or_default();
        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert(ID_FIELD, id.clone());
                id
            }
        };
        if contains_id(documents, &id) {
            return Err(MemoryDriverError::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        documents.push(document);
        Ok(InsertOneResult { inserted_id: id })
    }

    fn do_find_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, MemoryDriverError> {
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };
        for document in documents {
            if matches_filter(document, filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    fn do_find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<MemoryCursor, MemoryDriverError> {
        let mut matches = Vec::new();
        {
            let collections = self.collections.read();
            if let Some(documents) = collections.get(collection) {
                for document in documents {
                    if matches_filter(document, filter)? {
                        matches.push(document.clone());
                    }
                }
            }
        }
        if let Some(sort) = &options.sort {
            sort_documents(&mut matches, sort);
        }
        if let Some(skip) = options.skip {
            let skip = usize::try_from(skip).unwrap_or(usize::MAX).min(matches.len());
            matches.drain(..skip);
        }
        if let Some(limit) = options.limit {
            // A zero or negative limit means no limit, like the server.
            if limit > 0 {
                matches.truncate(limit as usize);
            }
        }
        Ok(MemoryCursor::new(matches))
    }

    fn do_update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, MemoryDriverError> {
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(no_match());
        };
        let Some(index) = position_of(documents, filter)? else {
            return Ok(no_match());
        };
        let stored = &mut documents[index];
        let mut updated = stored.clone();
        apply_update(&mut updated, update)?;
        let modified_count = u64::from(*stored != updated);
        *stored = updated;
        Ok(UpdateResult {
            matched_count: 1,
            modified_count,
            upserted_id: None,
        })
    }

    fn do_replace_one(
        &self,
        collection: &str,
        filter: &Document,
        mut replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, MemoryDriverError> {
        let mut collections = self.collections.write();
        let documents = collections.entry(collection.to_string()).or_default();
        if let Some(index) = position_of(documents, filter)? {
            let stored = &mut documents[index];
            match replacement.get(ID_FIELD) {
                Some(id) => {
                    if stored
                        .get(ID_FIELD)
                        .is_some_and(|existing| !matcher::equals(existing, id))
                    {
                        return Err(MemoryDriverError::ImmutableId);
                    }
                }
                None => {
                    if let Some(id) = stored.get(ID_FIELD) {
                        replacement.insert(ID_FIELD, id.clone());
                    }
                }
            }
            let modified_count = u64::from(*stored != replacement);
            *stored = replacement;
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count,
                upserted_id: None,
            });
        }
        if !upsert {
            return Ok(no_match());
        }
        let id = match replacement.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                // Borrow the identity from an equality filter on _id when
                // it names a concrete value, otherwise mint one.
                let id = filter
                    .get(ID_FIELD)
                    .filter(|id| !matches!(id, Bson::Document(_) | Bson::Null))
                    .cloned()
                    .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
                replacement.insert(ID_FIELD, id.clone());
                id
            }
        };
        if contains_id(documents, &id) {
            return Err(MemoryDriverError::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        documents.push(replacement);
        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    fn do_delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteResult, MemoryDriverError> {
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(DeleteResult { deleted_count: 0 });
        };
        let Some(index) = position_of(documents, filter)? else {
            return Ok(DeleteResult { deleted_count: 0 });
        };
        documents.remove(index);
        Ok(DeleteResult { deleted_count: 1 })
    }
}

fn position_of(
    documents: &[Document],
    filter: &Document,
) -> Result<Option<usize>, MemoryDriverError> {
    for (index, document) in documents.iter().enumerate() {
        if matches_filter(document, filter)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn contains_id(documents: &[Document], id: &Bson) -> bool {
    documents.iter().any(|document| {
        document
            .get(ID_FIELD)
            .is_some_and(|existing| matcher::equals(existing, id))
    })
}

fn no_match() -> UpdateResult {
    UpdateResult {
        matched_count: 0,
        modified_count: 0,
        upserted_id: None,
    }
}

impl Driver for MemoryDriver {
    type Cursor = MemoryCursor;

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        self.do_insert_one(collection, document).map_err(Into::into)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        self.do_find_one(collection, &filter).map_err(Into::into)
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        self.do_find(collection, &filter, &options).map_err(Into::into)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        self.do_update_one(collection, &filter, &update)
            .map_err(Into::into)
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        self.do_replace_one(collection, &filter, replacement, upsert)
            .map_err(Into::into)
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteResult, DriverError> {
        self.do_delete_one(collection, &filter).map_err(Into::into)
    }
}

#[async_trait]
impl AsyncDriver for MemoryDriver {
    type Cursor = MemoryCursor;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        self.do_insert_one(collection, document).map_err(Into::into)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        self.do_find_one(collection, &filter).map_err(Into::into)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<<Self as AsyncDriver>::Cursor, DriverError> {
        self.do_find(collection, &filter, &options).map_err(Into::into)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        self.do_update_one(collection, &filter, &update)
            .map_err(Into::into)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        self.do_replace_one(collection, &filter, replacement, upsert)
            .map_err(Into::into)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteResult, DriverError> {
        self.do_delete_one(collection, &filter).map_err(Into::into)
    }
}

/// Cursor over an already materialized result set.
///
/// Implements both [`Iterator`] and [`Stream`] so the one type serves the
/// blocking and the async driver contracts.
#[derive(Debug)]
pub struct MemoryCursor {
    documents: std::vec::IntoIter<Document>,
}

impl MemoryCursor {
    fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into_iter(),
        }
    }
}

impl Iterator for MemoryCursor {
    type Item = Result<Document, DriverError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.documents.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}

impl Stream for MemoryCursor {
    type Item = Result<Document, DriverError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().documents.next().map(Ok))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}
