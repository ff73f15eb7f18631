//! A thin object-document mapper binding plain record structs to a document
//! database driver.
//!
//! This crate is the core of the docbind project and provides:
//!
//! - **Record and field metadata** ([`document`]) - The `Record` trait, the
//!   per-field descriptor table, and the document conversion operations
//! - **Value conversion** ([`convert`]) - The `ToBson`/`FromBson` hook pair
//!   for primitives, containers, and semantic scalar types
//! - **Entity registry** ([`entity`]) - The `Entity` trait, runtime
//!   classification, and identity access
//! - **Driver abstraction** ([`driver`]) - Blocking and async driver
//!   contracts adapters implement
//! - **Repositories** ([`repo`], [`store`]) - Typed CRUD dispatch in
//!   blocking and async variants
//! - **Typed cursors** ([`cursor`]) - Decode-as-you-go wrappers over driver
//!   cursors
//! - **Update helpers** ([`update`]) - Constructors for common update
//!   operators
//! - **Error handling** ([`error`]) - The error taxonomy and result alias
//!
//! # Example
//!
//! ```ignore
//! use docbind_core::document::Record;
//! use docbind_core::entity::Entity;
//! use docbind_core::store::Datastore;
//! use bson::doc;
//!
//! #[derive(Debug, Record, Entity)]
//! #[entity(collection = "users")]
//! pub struct User {
//!     #[record(rename = "_id")]
//!     pub id: Option<bson::oid::ObjectId>,
//!     pub name: String,
//! }
//!
//! let store = Datastore::new(driver);
//! let users = store.repository::<User>();
//! let mut user = User { id: None, name: "Alice".into() };
//! users.insert_one(&mut user)?;
//! # Ok::<(), docbind_core::error::OdmError>(())
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbind_core;

pub mod convert;
pub mod cursor;
pub mod document;
pub mod driver;
pub mod entity;
pub mod error;
pub mod repo;
pub mod store;
pub mod update;

pub use bson;

#[doc(hidden)]
pub use inventory;
