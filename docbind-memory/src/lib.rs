//! In-memory driver for docbind.
//!
//! This crate provides a thread-safe, process-local implementation of the
//! docbind driver contracts. It evaluates the same filter and update
//! documents a real database would, which makes it a faithful stand-in
//! for tests, prototypes, and examples.
//!
//! # Features
//!
//! - **Both driver contracts** - Implements the blocking `Driver` and the
//!   async `AsyncDriver` over the same shared state
//! - **Mongo-style queries** - Comparison, logical, and membership filter
//!   operators plus dotted paths
//! - **Mongo-style updates** - Field and array update operators applied
//!   in place
//! - **Shared clones** - Cloning the driver shares the underlying
//!   collections, so a test and its fixture see the same data
//!
//! # Quick Start
//!
//! ```ignore
//! use docbind_core::store::Datastore;
//! use docbind_memory::MemoryDriver;
//!
//! #[derive(docbind_macros::Record, docbind_macros::Entity)]
//! struct User {
//!     #[record(rename = "_id")]
//!     id: bson::oid::ObjectId,
//!     name: String,
//! }
//!
//! let store = Datastore::new(MemoryDriver::new());
//! let users = store.repository::<User>();
//!
//! let mut user = User { id: bson::oid::ObjectId::new(), name: "Alice".into() };
//! users.insert_one(&mut user).unwrap();
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbind_memory;

pub mod matcher;
pub mod store;

pub use store::{MemoryCursor, MemoryDriver, MemoryDriverError};
