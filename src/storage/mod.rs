//! Storage layer - the record stores tree pages live in.
//!
//! The B+Tree only ever talks to a [`RecordStore`]: an opaque map from
//! [`RecordId`] to a byte blob. This module provides:
//! - [`RecordStore`] - The store contract
//! - [`MemoryStore`] - HashMap-backed store, for tests and scratch trees
//! - [`FileStore`] - Single-file store of fixed 4KB slots
//! - [`slot`] - On-disk slot layout used by `FileStore`
//! - [`StoreStats`] - Operation counters

mod file_store;
mod memory_store;
pub mod slot;
mod stats;

use std::sync::Arc;

use crate::common::{RecordId, Result};

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use stats::{StatsSnapshot, StoreStats};

/// A persistent map from record identifiers to byte blobs.
///
/// All methods take `&self`; implementations synchronise internally so a
/// store can be shared. Failures are reported as-is and callers pass them on
/// unchanged: nothing above a store retries.
///
/// # Atomicity
/// Each call is atomic on its own. Nothing groups several calls together, so
/// a failure between two writes of one tree operation leaves the earlier
/// write in place.
pub trait RecordStore {
    /// Read the record stored under `id`.
    ///
    /// # Errors
    /// `Error::RecordNotFound` if no such record exists.
    fn fetch(&self, id: RecordId) -> Result<Vec<u8>>;

    /// Store a new record and return its fresh identifier.
    ///
    /// The returned id is never `RecordId::NONE`.
    fn insert(&self, data: &[u8]) -> Result<RecordId>;

    /// Replace the contents of an existing record.
    ///
    /// # Errors
    /// `Error::RecordNotFound` if no such record exists.
    fn update(&self, id: RecordId, data: &[u8]) -> Result<()>;

    /// Remove a record. Its id may be handed out again later.
    ///
    /// # Errors
    /// `Error::RecordNotFound` if no such record exists.
    fn delete(&self, id: RecordId) -> Result<()>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn fetch(&self, id: RecordId) -> Result<Vec<u8>> {
        (**self).fetch(id)
    }

    fn insert(&self, data: &[u8]) -> Result<RecordId> {
        (**self).insert(data)
    }

    fn update(&self, id: RecordId, data: &[u8]) -> Result<()> {
        (**self).update(id, data)
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        (**self).delete(id)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn fetch(&self, id: RecordId) -> Result<Vec<u8>> {
        (**self).fetch(id)
    }

    fn insert(&self, data: &[u8]) -> Result<RecordId> {
        (**self).insert(data)
    }

    fn update(&self, id: RecordId, data: &[u8]) -> Result<()> {
        (**self).update(id, data)
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        (**self).delete(id)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Box<T> {
    fn fetch(&self, id: RecordId) -> Result<Vec<u8>> {
        (**self).fetch(id)
    }

    fn insert(&self, data: &[u8]) -> Result<RecordId> {
        (**self).insert(data)
    }

    fn update(&self, id: RecordId, data: &[u8]) -> Result<()> {
        (**self).update(id, data)
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        (**self).delete(id)
    }
}
