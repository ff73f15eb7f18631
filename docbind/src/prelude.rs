//! Convenient re-exports of commonly used types from docbind.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docbind::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `Record` and `Entity` traits and their derive macros
//! - Datastores, repositories, and cursors in both flavors
//! - The driver contracts and their option and result types
//! - Error types and the update document helpers

pub use docbind_core::{
    cursor::{AsyncCursor, Cursor},
    document::{DecodeOptions, FieldSpec, MissingFieldPolicy, Record},
    driver::{
        AsyncDriver, DeleteResult, Driver, FindOptions, InsertOneResult, UpdateResult,
    },
    entity::Entity,
    error::{DriverError, OdmError, OdmResult},
    repo::{AsyncRepository, Repository},
    store::{AsyncDatastore, Datastore},
    update,
};

pub use docbind_macros::{Entity, Record};
