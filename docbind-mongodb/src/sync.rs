//! Blocking driver built on the MongoDB driver's `sync` API.

use std::fmt;

use bson::Document;
use docbind_core::driver::{DeleteResult, Driver, FindOptions, InsertOneResult, UpdateResult};
use docbind_core::error::DriverError;
use mongodb::options::{ClientOptions, FindOptions as MongoFindOptions};
use mongodb::sync::{Client, Collection};

/// [`Driver`] implementation backed by the official MongoDB driver's
/// blocking API.
#[derive(Clone)]
pub struct MongoDriver {
    client: Client,
    database: String,
}

impl MongoDriver {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    /// Parses `uri`, connects, and targets `database`.
    pub fn connect(uri: &str, database: &str) -> Result<Self, DriverError> {
        let options = ClientOptions::parse(uri).run().map_err(DriverError::new)?;
        let client = Client::with_options(options).map_err(DriverError::new)?;
        Ok(Self::new(client, database))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> mongodb::sync::Database {
        self.client.database(&self.database)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database().collection(name)
    }
}

impl fmt::Debug for MongoDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoDriver")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Driver for MongoDriver {
    type Cursor = MongoCursor;

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        let result = self
            .collection(collection)
            .insert_one(document)
            .run()
            .map_err(DriverError::new)?;
        Ok(InsertOneResult {
            inserted_id: result.inserted_id,
        })
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        self.collection(collection)
            .find_one(filter)
            .run()
            .map_err(DriverError::new)
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        let mut find_options = MongoFindOptions::default();
        find_options.skip = options.skip;
        find_options.limit = options.limit;
        find_options.sort = options.sort;

        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(find_options)
            .run()
            .map_err(DriverError::new)?;
        Ok(MongoCursor { inner: cursor })
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        let result = self
            .collection(collection)
            .update_one(filter, update)
            .run()
            .map_err(DriverError::new)?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .upsert(upsert)
            .run()
            .map_err(DriverError::new)?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteResult, DriverError> {
        let result = self
            .collection(collection)
            .delete_one(filter)
            .run()
            .map_err(DriverError::new)?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }
}

/// Iterator cursor adapting the MongoDB driver's error type.
pub struct MongoCursor {
    inner: mongodb::sync::Cursor<Document>,
}

impl Iterator for MongoCursor {
    type Item = Result<Document, DriverError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|result| result.map_err(DriverError::new))
    }
}
