//! MongoDB driver for docbind.
//!
//! This crate implements the docbind driver contracts on top of the
//! official MongoDB driver, so repositories mapped with docbind persist
//! to MongoDB Atlas or a self-hosted deployment.
//!
//! To use it through the facade, enable the `mongodb` feature:
//!
//! ```toml
//! [dependencies]
//! docbind = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Async by default** - [`MongoDriver`] implements `AsyncDriver` on
//!   the driver's async API
//! - **Optional blocking API** - the `sync` cargo feature adds
//!   [`sync::MongoDriver`], a `Driver` built on the driver's blocking API
//! - **Query passthrough** - filters, update documents, and find options
//!   go to the server unchanged
//!
//! # Connection
//!
//! A driver needs a MongoDB connection string and a database name. Use
//! [`MongoDriver::connect`], or build a `mongodb::Client` yourself and
//! hand it to [`MongoDriver::new`].
//!
//! # Example
//!
//! ```ignore
//! use docbind_core::store::AsyncDatastore;
//! use docbind_mongodb::MongoDriver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = MongoDriver::connect("mongodb://localhost:27017", "app").await?;
//!     let store = AsyncDatastore::new(driver);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbind_mongodb;

pub mod store;
#[cfg(feature = "sync")]
pub mod sync;

pub use store::{MongoCursor, MongoDriver};
