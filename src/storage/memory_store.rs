//! In-memory record store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::{Error, RecordId, Result};
use crate::storage::{RecordStore, StoreStats};

/// A [`RecordStore`] that keeps every record in a `HashMap`.
///
/// Ids are handed out sequentially starting at 1 and are never reused, which
/// makes tree layouts in tests deterministic.
///
/// # Example
/// ```
/// use pagetree::{MemoryStore, RecordStore};
///
/// let store = MemoryStore::new();
/// let id = store.insert(b"abc").unwrap();
/// assert_eq!(store.fetch(id).unwrap(), b"abc");
/// ```
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    stats: StoreStats,
}

struct MemoryInner {
    records: HashMap<RecordId, Vec<u8>>,
    next_id: u64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                records: HashMap::new(),
                next_id: 1,
            }),
            stats: StoreStats::new(),
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record exists under `id`.
    pub fn contains(&self, id: RecordId) -> bool {
        self.inner.lock().records.contains_key(&id)
    }

    /// Copy of every record, ordered by id.
    ///
    /// Two stores with equal snapshots are byte-identical.
    pub fn snapshot(&self) -> BTreeMap<RecordId, Vec<u8>> {
        self.inner
            .lock()
            .records
            .iter()
            .map(|(&id, data)| (id, data.clone()))
            .collect()
    }

    /// Operation counters.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn fetch(&self, id: RecordId) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        let data = inner
            .records
            .get(&id)
            .cloned()
            .ok_or(Error::RecordNotFound(id))?;
        drop(inner);

        trace!(%id, len = data.len(), "fetch");
        self.stats.record_fetch(data.len());
        Ok(data)
    }

    fn insert(&self, data: &[u8]) -> Result<RecordId> {
        let id = {
            let mut inner = self.inner.lock();
            let id = RecordId::new(inner.next_id);
            inner.next_id += 1;
            inner.records.insert(id, data.to_vec());
            id
        };

        trace!(%id, len = data.len(), "insert");
        self.stats.record_insert(data.len());
        Ok(id)
    }

    fn update(&self, id: RecordId, data: &[u8]) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            let record = inner.records.get_mut(&id).ok_or(Error::RecordNotFound(id))?;
            record.clear();
            record.extend_from_slice(data);
        }

        trace!(%id, len = data.len(), "update");
        self.stats.record_update(data.len());
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        self.inner
            .lock()
            .records
            .remove(&id)
            .ok_or(Error::RecordNotFound(id))?;

        trace!(%id, "delete");
        self.stats.record_delete();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_fetch() {
        let store = MemoryStore::new();

        let a = store.insert(b"first").unwrap();
        let b = store.insert(b"second").unwrap();

        assert_eq!(a, RecordId::new(1));
        assert_eq!(b, RecordId::new(2));
        assert_eq!(store.fetch(a).unwrap(), b"first");
        assert_eq!(store.fetch(b).unwrap(), b"second");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update() {
        let store = MemoryStore::new();
        let id = store.insert(b"old").unwrap();

        store.update(id, b"new value").unwrap();
        assert_eq!(store.fetch(id).unwrap(), b"new value");
    }

    #[test]
    fn test_delete() {
        let store = MemoryStore::new();
        let id = store.insert(b"gone").unwrap();

        store.delete(id).unwrap();
        assert!(!store.contains(id));
        assert!(store.is_empty());
        assert!(matches!(store.fetch(id), Err(Error::RecordNotFound(_))));
        assert!(matches!(store.delete(id), Err(Error::RecordNotFound(_))));
    }

    #[test]
    fn test_missing_record() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update(RecordId::new(9), b"x"),
            Err(Error::RecordNotFound(_))
        ));
        assert!(store.fetch(RecordId::NONE).is_err());
    }

    #[test]
    fn test_ids_not_reused() {
        let store = MemoryStore::new();
        let a = store.insert(b"a").unwrap();
        store.delete(a).unwrap();
        let b = store.insert(b"b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_stats_and_snapshot() {
        let store = MemoryStore::new();
        let id = store.insert(b"abcd").unwrap();
        store.fetch(id).unwrap();

        let stats = store.stats().snapshot();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.bytes_written, 4);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&id], b"abcd".to_vec());
    }

    #[test]
    fn test_shared_through_reference() {
        fn put<S: RecordStore>(store: S) -> RecordId {
            store.insert(b"shared").unwrap()
        }

        let store = MemoryStore::new();
        let id = put(&store);
        assert_eq!(store.fetch(id).unwrap(), b"shared");
    }
}
