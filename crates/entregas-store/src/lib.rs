//! Persistent store for drivers, vehicles, customers, routes and deliveries
//!
//! The store owns relational integrity: primary-key and secondary uniqueness,
//! foreign-key existence, and on-delete rules. Business rules live in
//! `entregas-domain` and run inside [`EntityStore::transaction`].

mod json_store;
mod tables;

pub use json_store::JsonStore;
pub use tables::Tables;

use std::fmt::Display;

use entregas_types::{Entity, EntityKind, Result};

/// Record-level operations available inside a transaction
pub trait Records {
    /// Insert a new record; fails on duplicate key, duplicate unique field,
    /// dangling reference or invalid fields
    fn create<E: Entity>(&mut self, entity: E) -> Result<E>;

    /// Fetch a record by primary key
    fn get<E: Entity>(&self, key: impl Display) -> Result<E>;

    /// Fetch a record by primary key, `None` when absent
    fn find<E: Entity>(&self, key: impl Display) -> Result<Option<E>>;

    /// All records of one type matching a predicate, in key order
    fn filter<E: Entity, P>(&self, predicate: P) -> Result<Vec<E>>
    where
        P: Fn(&E) -> bool;

    /// All records of one type, in key order
    fn all<E: Entity>(&self) -> Result<Vec<E>> {
        self.filter(|_: &E| true)
    }

    /// Replace an existing record
    fn update<E: Entity>(&mut self, entity: &E) -> Result<()>;

    /// Delete a record, applying the on-delete rule of every reference to it
    fn delete<E: Entity>(&mut self, key: impl Display) -> Result<()>;

    /// Allocate the next identifier of a store-keyed entity type
    fn next_id(&mut self, kind: EntityKind) -> u64;
}

/// A store that runs record operations atomically
pub trait EntityStore {
    type Tx: Records;

    /// Run `f` atomically: its writes are committed only if it returns `Ok`,
    /// and no other transaction on this store interleaves with it
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T>;

    /// Run a read-only closure against a consistent view
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self::Tx) -> Result<T>;
}
