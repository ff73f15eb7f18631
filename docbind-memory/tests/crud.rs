//! End-to-end tests: derived entities against the in-memory driver.

use bson::oid::ObjectId;
use bson::{Bson, doc};
use chrono::{DateTime, Utc};
use docbind_core::document::{DecodeOptions, field_meta};
use docbind_core::driver::{Driver, FindOptions};
use docbind_core::error::OdmError;
use docbind_core::store::{AsyncDatastore, Datastore};
use docbind_core::update;
use docbind_macros::{Entity, Record};
use docbind_memory::MemoryDriver;
use futures::TryStreamExt;

fn default_motto() -> String {
    "ready".to_string()
}

#[derive(Debug, Clone, PartialEq, Record, Entity)]
#[entity(collection = "players")]
struct Player {
    #[record(rename = "_id")]
    id: ObjectId,
    #[record(unique)]
    name: String,
    score: i64,
    #[record(default)]
    tags: Vec<String>,
    #[record(default = "default_motto")]
    motto: String,
}

impl Player {
    fn new(name: &str, score: i64) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.to_string(),
            score,
            tags: Vec::new(),
            motto: default_motto(),
        }
    }
}

/// Identity left to the database; collection name falls back to the
/// snake_cased type name.
#[derive(Debug, Clone, PartialEq, Record, Entity)]
struct Invoice {
    #[record(rename = "_id")]
    id: Option<ObjectId>,
    customer: String,
    total: f64,
    issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Record, Entity)]
#[entity(collection = "sessions")]
struct Session {
    #[record(rename = "_id")]
    id: String,
    token: Bson,
}

#[test]
fn insert_assigns_a_generated_id() {
    let driver = MemoryDriver::new();
    let store = Datastore::new(driver.clone());
    let invoices = store.repository::<Invoice>();

    let mut invoice = Invoice {
        id: None,
        customer: "ACME".to_string(),
        total: 99.5,
        issued_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
    };
    let result = invoices.insert_one(&mut invoice).unwrap();

    let id = invoice.id.expect("identity written back");
    assert_eq!(result.inserted_id, Bson::ObjectId(id));
    assert_eq!(driver.collection_names(), vec!["invoice"]);

    let found = invoices.find_one(doc! { "_id": id }).unwrap().unwrap();
    assert_eq!(found, invoice);
}

#[test]
fn insert_keeps_a_client_supplied_id() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    let id = player.id;
    let result = players.insert_one(&mut player).unwrap();
    assert_eq!(result.inserted_id, Bson::ObjectId(id));
    assert_eq!(player.id, id);
}

#[test]
fn duplicate_inserts_surface_the_driver_error() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();
    let err = players.insert_one(&mut player.clone()).unwrap_err();
    assert!(matches!(err, OdmError::Driver(_)));
}

#[test]
fn find_one_returns_none_when_absent() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();
    let found = players.find_one(doc! { "_id": ObjectId::new() }).unwrap();
    assert!(found.is_none());
}

#[test]
fn find_sorts_and_pages() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    for (name, score) in [("Ada", 10), ("Grace", 20), ("Edsger", 30)] {
        players.insert_one(&mut Player::new(name, score)).unwrap();
    }

    let options = FindOptions::new().sort(doc! { "score": -1 }).limit(2);
    let top: Vec<Player> = players
        .find(doc! { "score": { "$gte": 10 } }, options)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let names: Vec<&str> = top.iter().map(|player| player.name.as_str()).collect();
    assert_eq!(names, vec!["Edsger", "Grace"]);
}

#[test]
fn update_one_applies_an_update_document() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();

    let change = update::merge([
        update::set(doc! { "motto": "onwards" }),
        update::inc(doc! { "score": 5 }),
    ]);
    let result = players.update_one(&player, change).unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);

    let found = players.find_one(doc! { "_id": player.id }).unwrap().unwrap();
    assert_eq!(found.motto, "onwards");
    assert_eq!(found.score, 15);
}

#[test]
fn update_fields_pushes_only_the_named_fields() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();

    player.motto = "changed".to_string();
    player.score = 99;
    players.update_fields(&player, &["motto"]).unwrap();

    let found = players.find_one(doc! { "_id": player.id }).unwrap().unwrap();
    assert_eq!(found.motto, "changed");
    assert_eq!(found.score, 10);
}

#[test]
fn update_fields_rejects_unknown_field_names() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();

    let err = players.update_fields(&player, &["scoer"]).unwrap_err();
    assert!(matches!(err, OdmError::Configuration(_)));
}

#[test]
fn replace_one_persists_local_changes() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();

    player.name = "Ada Lovelace".to_string();
    player.tags.push("analyst".to_string());
    let result = players.replace_one(&player, false).unwrap();
    assert_eq!(result.matched_count, 1);

    let found = players.find_one(doc! { "_id": player.id }).unwrap().unwrap();
    assert_eq!(found, player);
}

#[test]
fn replace_one_upserts_a_new_entity() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let player = Player::new("Alan", 41);
    let result = players.replace_one(&player, true).unwrap();
    assert_eq!(result.matched_count, 0);
    assert_eq!(result.upserted_id, Some(Bson::ObjectId(player.id)));

    let found = players.find_one(doc! { "_id": player.id }).unwrap().unwrap();
    assert_eq!(found, player);
}

#[test]
fn delete_one_removes_the_entity() {
    let store = Datastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();

    assert_eq!(players.delete_one(&player).unwrap().deleted_count, 1);
    assert_eq!(players.delete_one(&player).unwrap().deleted_count, 0);
    assert!(players.find_one(doc! { "_id": player.id }).unwrap().is_none());
}

#[test]
fn renamed_fields_use_the_external_name_on_the_wire() {
    let driver = MemoryDriver::new();
    let store = Datastore::new(driver.clone());
    let players = store.repository::<Player>();

    let mut player = Player::new("Ada", 10);
    players.insert_one(&mut player).unwrap();

    let raw = Driver::find_one(&driver, "players", doc! { "name": "Ada" })
        .unwrap()
        .unwrap();
    assert_eq!(raw.get("_id"), Some(&Bson::ObjectId(player.id)));
    assert!(raw.get("id").is_none());
}

#[test]
fn field_specs_expose_rename_and_unique() {
    let id = field_meta::<Player>("id").unwrap();
    assert_eq!(id.external_name(), "_id");

    let name = field_meta::<Player>("name").unwrap();
    assert!(name.unique);
    assert!(!field_meta::<Player>("score").unwrap().unique);
}

#[test]
fn extra_keys_are_ignored_and_defaults_fill_gaps() {
    let driver = MemoryDriver::new();
    let store = Datastore::new(driver.clone());
    let players = store.repository::<Player>();

    let id = ObjectId::new();
    Driver::insert_one(
        &driver,
        "players",
        doc! { "_id": id, "name": "Ada", "score": 10, "legacy_flag": true },
    )
    .unwrap();

    let found = players.find_one(doc! { "_id": id }).unwrap().unwrap();
    assert_eq!(found.tags, Vec::<String>::new());
    assert_eq!(found.motto, "ready");
}

#[test]
fn strict_decoding_reports_missing_fields() {
    let driver = MemoryDriver::new();
    let store = Datastore::new(driver.clone());
    let sessions = store.repository::<Session>();

    Driver::insert_one(&driver, "sessions", doc! { "_id": "s1" }).unwrap();

    let err = sessions.find_one(doc! { "_id": "s1" }).unwrap_err();
    match err {
        OdmError::MissingField { record, field } => {
            assert_eq!(record, "Session");
            assert_eq!(field, "token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lenient_decoding_fills_missing_fields_with_null() {
    let driver = MemoryDriver::new();
    let store = Datastore::new(driver.clone());
    let sessions = store
        .repository::<Session>()
        .with_decode_options(DecodeOptions::lenient());

    Driver::insert_one(&driver, "sessions", doc! { "_id": "s1" }).unwrap();

    let session = sessions.find_one(doc! { "_id": "s1" }).unwrap().unwrap();
    assert_eq!(session.token, Bson::Null);
}

#[tokio::test]
async fn async_crud_roundtrip() {
    let store = AsyncDatastore::new(MemoryDriver::new());
    let players = store.repository::<Player>();

    let mut ada = Player::new("Ada", 10);
    let mut grace = Player::new("Grace", 20);
    players.insert_one(&mut ada).await.unwrap();
    players.insert_one(&mut grace).await.unwrap();

    let everyone: Vec<Player> = players
        .find(doc! {}, FindOptions::new().sort(doc! { "score": 1 }))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(everyone, vec![ada.clone(), grace.clone()]);

    players
        .update_one(&ada, update::inc(doc! { "score": 1 }))
        .await
        .unwrap();
    let found = players.find_one(doc! { "_id": ada.id }).await.unwrap().unwrap();
    assert_eq!(found.score, 11);

    grace.score = 25;
    players.update_fields(&grace, &["score"]).await.unwrap();
    let found = players.find_one(doc! { "_id": grace.id }).await.unwrap().unwrap();
    assert_eq!(found.score, 25);

    players.delete_one(&ada).await.unwrap();
    assert!(players.find_one(doc! { "_id": ada.id }).await.unwrap().is_none());
}
