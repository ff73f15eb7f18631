//! Main docbind crate providing a thin object-document mapper.
//!
//! This crate is the primary entry point for users of docbind. It
//! re-exports the core mapping machinery, the derive macros, and the
//! bundled drivers, so one dependency line is enough for most projects.
//!
//! # Features
//!
//! - **Derived mapping** - `#[derive(Record, Entity)]` turns a plain
//!   struct into a mapped entity with field renames, defaults, and a
//!   registered collection name
//! - **Typed repositories** - CRUD operations that convert between your
//!   structs and BSON documents at the driver boundary
//! - **Blocking and async** - every operation exists in both flavors,
//!   backed by the `Driver` and `AsyncDriver` contracts
//! - **Multiple drivers** - in-memory out of the box, MongoDB behind the
//!   `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use docbind::bson::doc;
//! use docbind::bson::oid::ObjectId;
//! use docbind::memory::MemoryDriver;
//! use docbind::prelude::*;
//!
//! #[derive(Debug, Clone, Record, Entity)]
//! #[entity(collection = "users")]
//! pub struct User {
//!     #[record(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//!     #[record(default)]
//!     pub tags: Vec<String>,
//! }
//!
//! fn main() -> OdmResult<()> {
//!     let store = Datastore::new(MemoryDriver::new());
//!     let users = store.repository::<User>();
//!
//!     let mut user = User {
//!         id: ObjectId::new(),
//!         name: "Alice".to_string(),
//!         tags: vec![],
//!     };
//!     users.insert_one(&mut user)?;
//!
//!     let found = users.find_one(doc! { "name": "Alice" })?;
//!     println!("found: {found:?}");
//!
//!     users.delete_one(&user)?;
//!     Ok(())
//! }
//! ```
//!
//! # Async
//!
//! The async twins mirror the blocking API method for method:
//!
//! ```ignore
//! use docbind::memory::MemoryDriver;
//! use docbind::prelude::*;
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> OdmResult<()> {
//!     let store = AsyncDatastore::new(MemoryDriver::new());
//!     let users = store.repository::<User>();
//!
//!     let mut user = User { /* ... */ };
//!     users.insert_one(&mut user).await?;
//!
//!     let all: Vec<User> = users
//!         .find(docbind::bson::doc! {}, FindOptions::new())
//!         .await?
//!         .try_collect()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom drivers
//!
//! Anything that can execute the six operations in
//! [`driver::Driver`] or [`driver::AsyncDriver`] can sit behind a
//! repository; the mapper never talks to a database in any other way.
//!
//! # Drivers
//!
//! - [`memory`] - process-local driver for development and testing
//! - [`mongodb`] - MongoDB driver (requires the `mongodb` feature; add
//!   the `mongodb-sync` feature for its blocking variant)

pub mod prelude;

pub use docbind_core::{convert, cursor, document, driver, entity, error, repo, store, update};

pub use docbind_macros::{Entity, Record};

// Re-export BSON types for convenience
pub use bson;

// The derive output refers to `::docbind::inventory` when used through
// this crate.
#[doc(hidden)]
pub use docbind_core::inventory;

/// In-memory driver.
pub mod memory {
    pub use docbind_memory::{MemoryCursor, MemoryDriver, MemoryDriverError, matcher};
}

/// MongoDB driver.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbind_mongodb::{MongoCursor, MongoDriver};

    #[cfg(feature = "mongodb-sync")]
    pub use docbind_mongodb::sync;
}
