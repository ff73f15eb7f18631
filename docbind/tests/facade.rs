//! Smoke tests for the facade: prelude imports, derives, and both
//! datastore flavors working together.

use docbind::bson::doc;
use docbind::bson::oid::ObjectId;
use docbind::memory::MemoryDriver;
use docbind::prelude::*;

#[derive(Debug, Clone, PartialEq, Record, Entity)]
#[entity(collection = "notes")]
struct Note {
    #[record(rename = "_id")]
    id: Option<ObjectId>,
    body: String,
    #[record(default)]
    pinned: bool,
}

#[test]
fn blocking_crud_through_the_facade() {
    let store = Datastore::new(MemoryDriver::new());
    let notes = store.repository::<Note>();

    let mut note = Note {
        id: None,
        body: "remember the milk".to_string(),
        pinned: false,
    };
    notes.insert_one(&mut note).unwrap();
    assert!(note.id.is_some());

    let found = notes
        .find_one(doc! { "body": "remember the milk" })
        .unwrap()
        .unwrap();
    assert_eq!(found, note);

    notes
        .update_one(&note, update::set(doc! { "pinned": true }))
        .unwrap();
    let found = notes.find_one(doc! { "pinned": true }).unwrap().unwrap();
    assert!(found.pinned);

    notes.delete_one(&note).unwrap();
    assert!(notes.find_one(doc! {}).unwrap().is_none());
}

#[tokio::test]
async fn async_crud_through_the_facade() {
    use futures::TryStreamExt;

    let store = AsyncDatastore::new(MemoryDriver::new());
    let notes = store.repository::<Note>();

    for body in ["one", "two", "three"] {
        let mut note = Note {
            id: None,
            body: body.to_string(),
            pinned: false,
        };
        notes.insert_one(&mut note).await.unwrap();
    }

    let all: Vec<Note> = notes
        .find(doc! {}, FindOptions::new().sort(doc! { "body": 1 }))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    let bodies: Vec<&str> = all.iter().map(|note| note.body.as_str()).collect();
    assert_eq!(bodies, vec!["one", "three", "two"]);
}
