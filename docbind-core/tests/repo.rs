//! Repository behavior against a recording driver: what reaches the
//! driver, what is rejected before any call, and what is written back.

use std::any::TypeId;
use std::sync::Mutex;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use docbind_core::convert::{FromBson, ToBson};
use docbind_core::document::{DecodeOptions, FieldSpec, Record, decode_field};
use docbind_core::driver::{
    AsyncDriver, DeleteResult, Driver, FindOptions, InsertOneResult, UpdateResult,
};
use docbind_core::entity::{Entity, EntityMeta, EntityMetaWrapper, external_names, has_id_field};
use docbind_core::error::{DriverError, OdmError, OdmResult};
use docbind_core::store::{AsyncDatastore, Datastore};
use futures::executor::block_on;

/// Driver double that records every call and answers with canned results.
#[derive(Debug)]
struct RecordingDriver {
    assigned_id: Bson,
    calls: Mutex<Vec<&'static str>>,
    last_filter: Mutex<Option<Document>>,
    last_update: Mutex<Option<Document>>,
    last_document: Mutex<Option<Document>>,
}

impl RecordingDriver {
    fn new() -> Self {
        Self::with_assigned_id(Bson::ObjectId(ObjectId::new()))
    }

    fn with_assigned_id(id: Bson) -> Self {
        Self {
            assigned_id: id,
            calls: Mutex::new(Vec::new()),
            last_filter: Mutex::new(None),
            last_update: Mutex::new(None),
            last_document: Mutex::new(None),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn last_filter(&self) -> Option<Document> {
        self.last_filter.lock().unwrap().clone()
    }

    fn last_update(&self) -> Option<Document> {
        self.last_update.lock().unwrap().clone()
    }

    fn last_document(&self) -> Option<Document> {
        self.last_document.lock().unwrap().clone()
    }

    fn observe(
        &self,
        call: &'static str,
        filter: Option<Document>,
        update: Option<Document>,
        document: Option<Document>,
    ) {
        self.calls.lock().unwrap().push(call);
        if filter.is_some() {
            *self.last_filter.lock().unwrap() = filter;
        }
        if update.is_some() {
            *self.last_update.lock().unwrap() = update;
        }
        if document.is_some() {
            *self.last_document.lock().unwrap() = document;
        }
    }

    fn matched_one(&self) -> UpdateResult {
        UpdateResult {
            matched_count: 1,
            modified_count: 1,
            upserted_id: None,
        }
    }
}

impl Driver for RecordingDriver {
    type Cursor = std::vec::IntoIter<Result<Document, DriverError>>;

    fn insert_one(
        &self,
        _collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        self.observe("insert_one", None, None, Some(document));
        Ok(InsertOneResult {
            inserted_id: self.assigned_id.clone(),
        })
    }

    fn find_one(
        &self,
        _collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        self.observe("find_one", Some(filter), None, None);
        Ok(None)
    }

    fn find(
        &self,
        _collection: &str,
        filter: Document,
        _options: FindOptions,
    ) -> Result<Self::Cursor, DriverError> {
        self.observe("find", Some(filter), None, None);
        Ok(Vec::new().into_iter())
    }

    fn update_one(
        &self,
        _collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        self.observe("update_one", Some(filter), Some(update), None);
        Ok(self.matched_one())
    }

    fn replace_one(
        &self,
        _collection: &str,
        filter: Document,
        replacement: Document,
        _upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        self.observe("replace_one", Some(filter), None, Some(replacement));
        Ok(self.matched_one())
    }

    fn delete_one(&self, _collection: &str, filter: Document) -> Result<DeleteResult, DriverError> {
        self.observe("delete_one", Some(filter), None, None);
        Ok(DeleteResult { deleted_count: 1 })
    }
}

#[async_trait]
impl AsyncDriver for RecordingDriver {
    type Cursor = futures::stream::Iter<std::vec::IntoIter<Result<Document, DriverError>>>;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DriverError> {
        Driver::insert_one(self, collection, document)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DriverError> {
        Driver::find_one(self, collection, filter)
    }

    async fn find(
        &self,
        _collection: &str,
        filter: Document,
        _options: FindOptions,
    ) -> Result<<Self as AsyncDriver>::Cursor, DriverError> {
        self.observe("find", Some(filter), None, None);
        Ok(futures::stream::iter(Vec::new().into_iter()))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DriverError> {
        Driver::update_one(self, collection, filter, update)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateResult, DriverError> {
        Driver::replace_one(self, collection, filter, replacement, upsert)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteResult, DriverError> {
        Driver::delete_one(self, collection, filter)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Device {
    id: Option<ObjectId>,
    name: String,
    level: i64,
}

impl Device {
    fn sample() -> Self {
        Self {
            id: None,
            name: "probe".to_string(),
            level: 3,
        }
    }
}

impl Record for Device {
    fn record_name() -> &'static str {
        "Device"
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        static FIELDS: [FieldSpec<Device>; 3] = [
            FieldSpec {
                name: "id",
                rename: Some("_id"),
                unique: false,
                get: |record| record.id.to_bson(),
                set: |record, value| {
                    record.id = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "name",
                rename: None,
                unique: false,
                get: |record| record.name.to_bson(),
                set: |record, value| {
                    record.name = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "level",
                rename: None,
                unique: false,
                get: |record| record.level.to_bson(),
                set: |record, value| {
                    record.level = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
        ];
        &FIELDS
    }

    fn from_document_with(mut document: Document, options: &DecodeOptions) -> OdmResult<Self> {
        Ok(Self {
            id: decode_field::<Self, _>(&mut document, "id", Some(|| None), options)?,
            name: decode_field::<Self, _>(&mut document, "name", None, options)?,
            level: decode_field::<Self, _>(&mut document, "level", None, options)?,
        })
    }
}

impl Entity for Device {
    fn collection_name() -> &'static str {
        "devices"
    }
}

docbind_core::inventory::submit! {
    EntityMetaWrapper(EntityMeta::new(
        TypeId::of::<Device>,
        "Device",
        "devices",
        external_names::<Device>,
        has_id_field::<Device>,
    ))
}

/// Implements `Entity` but is never registered.
#[derive(Debug, Clone, PartialEq)]
struct Ghost {
    id: Option<ObjectId>,
}

impl Record for Ghost {
    fn record_name() -> &'static str {
        "Ghost"
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        static FIELDS: [FieldSpec<Ghost>; 1] = [FieldSpec {
            name: "id",
            rename: Some("_id"),
            unique: false,
            get: |record| record.id.to_bson(),
            set: |record, value| {
                record.id = FromBson::from_bson(value)?;
                Ok(())
            },
        }];
        &FIELDS
    }

    fn from_document_with(mut document: Document, options: &DecodeOptions) -> OdmResult<Self> {
        Ok(Self {
            id: decode_field::<Self, _>(&mut document, "id", Some(|| None), options)?,
        })
    }
}

impl Entity for Ghost {
    fn collection_name() -> &'static str {
        "ghosts"
    }
}

/// Registered, but two fields share an external name.
#[derive(Debug, Clone, PartialEq)]
struct Broken {
    id: Option<ObjectId>,
    a: String,
    b: String,
}

impl Record for Broken {
    fn record_name() -> &'static str {
        "Broken"
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        static FIELDS: [FieldSpec<Broken>; 3] = [
            FieldSpec {
                name: "id",
                rename: Some("_id"),
                unique: false,
                get: |record| record.id.to_bson(),
                set: |record, value| {
                    record.id = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "a",
                rename: Some("dup"),
                unique: false,
                get: |record| record.a.to_bson(),
                set: |record, value| {
                    record.a = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "b",
                rename: Some("dup"),
                unique: false,
                get: |record| record.b.to_bson(),
                set: |record, value| {
                    record.b = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
        ];
        &FIELDS
    }

    fn from_document_with(mut document: Document, options: &DecodeOptions) -> OdmResult<Self> {
        Ok(Self {
            id: decode_field::<Self, _>(&mut document, "id", Some(|| None), options)?,
            a: decode_field::<Self, _>(&mut document, "a", None, options)?,
            b: decode_field::<Self, _>(&mut document, "b", None, options)?,
        })
    }
}

impl Entity for Broken {
    fn collection_name() -> &'static str {
        "broken"
    }
}

docbind_core::inventory::submit! {
    EntityMetaWrapper(EntityMeta::new(
        TypeId::of::<Broken>,
        "Broken",
        "broken",
        external_names::<Broken>,
        has_id_field::<Broken>,
    ))
}

#[test]
fn unregistered_entities_fail_before_any_driver_call() {
    let store = Datastore::new(RecordingDriver::new());
    let ghosts = store.repository::<Ghost>();
    let mut ghost = Ghost { id: None };

    assert!(matches!(
        ghosts.insert_one(&mut ghost).unwrap_err(),
        OdmError::TypeMismatch(_)
    ));
    assert!(matches!(
        ghosts.find_one(doc! {}).unwrap_err(),
        OdmError::TypeMismatch(_)
    ));
    assert!(ghosts.find(doc! {}, FindOptions::new()).is_err());
    assert!(ghosts.update_one(&ghost, doc! {}).is_err());
    assert!(ghosts.update_fields(&ghost, &["id"]).is_err());
    assert!(ghosts.replace_one(&ghost, false).is_err());
    assert!(ghosts.delete_one(&ghost).is_err());

    assert!(store.driver().calls().is_empty());
}

#[test]
fn misconfigured_entities_fail_before_any_driver_call() {
    let store = Datastore::new(RecordingDriver::new());
    let broken = store.repository::<Broken>();
    let mut entity = Broken {
        id: None,
        a: "x".to_string(),
        b: "y".to_string(),
    };

    assert!(matches!(
        broken.insert_one(&mut entity).unwrap_err(),
        OdmError::Configuration(_)
    ));
    assert!(matches!(
        broken.find_one(doc! {}).unwrap_err(),
        OdmError::Configuration(_)
    ));
    assert!(store.driver().calls().is_empty());
}

#[test]
fn insert_strips_null_identity_and_writes_back() {
    let oid = ObjectId::new();
    let store = Datastore::new(RecordingDriver::with_assigned_id(Bson::ObjectId(oid)));
    let devices = store.repository::<Device>();

    let mut device = Device::sample();
    let result = devices.insert_one(&mut device).unwrap();

    assert_eq!(result.inserted_id, Bson::ObjectId(oid));
    assert_eq!(device.id, Some(oid));

    let sent = store.driver().last_document().unwrap();
    assert!(sent.get("_id").is_none());
    assert_eq!(sent.get_str("name").unwrap(), "probe");
    assert_eq!(sent.get_i64("level").unwrap(), 3);
}

#[test]
fn insert_keeps_a_present_identity() {
    let oid = ObjectId::new();
    let store = Datastore::new(RecordingDriver::with_assigned_id(Bson::ObjectId(oid)));
    let devices = store.repository::<Device>();

    let mut device = Device {
        id: Some(oid),
        ..Device::sample()
    };
    devices.insert_one(&mut device).unwrap();

    let sent = store.driver().last_document().unwrap();
    assert_eq!(sent.get("_id"), Some(&Bson::ObjectId(oid)));
}

#[test]
fn update_fields_submits_only_the_named_fields() {
    let oid = ObjectId::new();
    let store = Datastore::new(RecordingDriver::new());
    let devices = store.repository::<Device>();

    let device = Device {
        id: Some(oid),
        ..Device::sample()
    };
    devices.update_fields(&device, &["name"]).unwrap();

    assert_eq!(store.driver().calls(), vec!["update_one"]);
    assert_eq!(store.driver().last_filter().unwrap(), doc! { "_id": oid });
    assert_eq!(
        store.driver().last_update().unwrap(),
        doc! { "$set": { "name": "probe" } }
    );
}

#[test]
fn update_fields_rejects_unknown_names_without_a_call() {
    let store = Datastore::new(RecordingDriver::new());
    let devices = store.repository::<Device>();

    let device = Device {
        id: Some(ObjectId::new()),
        ..Device::sample()
    };
    assert!(matches!(
        devices.update_fields(&device, &["levle"]).unwrap_err(),
        OdmError::Configuration(_)
    ));
    assert!(store.driver().calls().is_empty());
}

#[test]
fn mutating_operations_filter_by_identity() {
    let oid = ObjectId::new();
    let store = Datastore::new(RecordingDriver::new());
    let devices = store.repository::<Device>();
    let device = Device {
        id: Some(oid),
        ..Device::sample()
    };

    devices.update_one(&device, doc! { "$inc": { "level": 1 } }).unwrap();
    assert_eq!(store.driver().last_filter().unwrap(), doc! { "_id": oid });

    devices.replace_one(&device, false).unwrap();
    assert_eq!(store.driver().last_filter().unwrap(), doc! { "_id": oid });
    let replacement = store.driver().last_document().unwrap();
    assert_eq!(replacement.get("_id"), Some(&Bson::ObjectId(oid)));

    devices.delete_one(&device).unwrap();
    assert_eq!(store.driver().last_filter().unwrap(), doc! { "_id": oid });

    assert_eq!(
        store.driver().calls(),
        vec!["update_one", "replace_one", "delete_one"]
    );
}

#[test]
fn find_passes_the_filter_through() {
    let store = Datastore::new(RecordingDriver::new());
    let devices = store.repository::<Device>();

    let found: Vec<Device> = devices
        .find(doc! { "level": { "$gte": 2 } }, FindOptions::new())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(found.is_empty());
    assert_eq!(
        store.driver().last_filter().unwrap(),
        doc! { "level": { "$gte": 2 } }
    );
}

#[test]
fn async_repository_mirrors_the_blocking_behavior() {
    block_on(async {
        let oid = ObjectId::new();
        let store = AsyncDatastore::new(RecordingDriver::with_assigned_id(Bson::ObjectId(oid)));
        let devices = store.repository::<Device>();

        let mut device = Device::sample();
        devices.insert_one(&mut device).await.unwrap();
        assert_eq!(device.id, Some(oid));

        let ghosts = store.repository::<Ghost>();
        let mut ghost = Ghost { id: None };
        assert!(matches!(
            ghosts.insert_one(&mut ghost).await.unwrap_err(),
            OdmError::TypeMismatch(_)
        ));

        assert_eq!(store.driver().calls(), vec!["insert_one"]);
    });
}
