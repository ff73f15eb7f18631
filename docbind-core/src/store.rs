//! Datastore entry points.
//!
//! A datastore owns a driver and hands out typed repositories:
//!
//! - [`Datastore`] - blocking, over a [`Driver`]
//! - [`AsyncDatastore`] - suspension-capable, over an [`AsyncDriver`]
//!
//! A driver implementing both traits (the in-memory one does) can be
//! wrapped in either.
//!
//! # Example
//!
//! ```ignore
//! use docbind::store::Datastore;
//!
//! let store = Datastore::new(driver);
//! let users = store.repository::<User>();
//! ```

use crate::driver::{AsyncDriver, Driver};
use crate::entity::Entity;
use crate::repo::{AsyncRepository, Repository};

/// A blocking datastore bound to a specific driver.
#[derive(Debug)]
pub struct Datastore<D: Driver> {
    driver: D,
}

impl<D: Driver> Datastore<D> {
    /// Creates a datastore over the given driver.
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Returns a repository for the entity type `E`.
    ///
    /// The collection is determined by the type's registered binding.
    pub fn repository<E: Entity>(&self) -> Repository<'_, D, E> {
        Repository::new(&self.driver)
    }

    /// Borrows the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Consumes the datastore, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }
}

/// A suspension-capable datastore bound to a specific driver.
#[derive(Debug)]
pub struct AsyncDatastore<D: AsyncDriver> {
    driver: D,
}

impl<D: AsyncDriver> AsyncDatastore<D> {
    /// Creates a datastore over the given driver.
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Returns a repository for the entity type `E`.
    ///
    /// The collection is determined by the type's registered binding.
    pub fn repository<E: Entity>(&self) -> AsyncRepository<'_, D, E> {
        AsyncRepository::new(&self.driver)
    }

    /// Borrows the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Consumes the datastore, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }
}
