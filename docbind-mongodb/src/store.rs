use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bson::Document;
use docbind_core::driver::{
    AsyncDriver, DeleteResult, FindOptions, InsertOneResult, UpdateResult,
};
use docbind_core::error::DriverError;
use futures::Stream;
use mongodb::options::{ClientOptions, FindOptions as MongoFindOptions};
use mongodb::{Client, Collection};

/// [`AsyncDriver`] implementation backed by the official MongoDB driver.
#[derive(Debug, Clone)]
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
    pub async fn connect(uri: &str, database: &str) -> Result<Self, DriverError> {
        let options = ClientOptions::parse(uri).await.map_err(DriverError::new)?;
        let client = Client::with_options(options).map_err(DriverError::new)?;
        Ok(Self::new(client, database))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> mongodb::Database {
        self.client.database(&self.database)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database().collection(name)
    }
}

#[async_trait]
impl AsyncDriver for MongoDriver {
    type Cursor = MongoCursor;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(DriverError::new)?;
        Ok(InsertOneResult {
            inserted_id: result.inserted_id,
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        self.collection(collection)
            .find_one(filter)
            .await
            .map_err(DriverError::new)
    }

    async fn find(
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
            .await
            .map_err(DriverError::new)?;
        Ok(MongoCursor { inner: cursor })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        let result = self
            .collection(collection)
            .update_one(filter, update)
            .await
            .map_err(DriverError::new)?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn replace_one(
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
            .await
            .map_err(DriverError::new)?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteResult, DriverError> {
        let result = self
            .collection(collection)
            .delete_one(filter)
            .await
            .map_err(DriverError::new)?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }
}

/// Streaming cursor adapting the MongoDB driver's error type.
pub struct MongoCursor {
    inner: mongodb::Cursor<Document>,
}

impl Stream for MongoCursor {
    type Item = Result<Document, DriverError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner)
            .poll_next(cx)
            .map(|item| item.map(|result| result.map_err(DriverError::new)))
    }
}
