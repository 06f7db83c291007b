//! File Store - records persisted in fixed-size slots of a single file.
//!
//! The [`FileStore`] handles all direct file operations:
//! - Reading and writing slots
//! - Allocating new slots and reusing freed ones
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::{info, trace};

use crate::common::config::{FileStoreConfig, SLOT_SIZE};
use crate::common::{Error, RecordId, Result};
use crate::storage::slot::{Slot, SlotType};
use crate::storage::{RecordStore, StoreStats};

/// A [`RecordStore`] backed by one file of fixed 4KB slots.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Slot 0  │ Slot 1  │ Slot 2  │  ...    │ Slot N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Record `id` lives in slot `id - 1`, so `RecordId::NONE` (0) never names a
/// slot. A record must fit in one slot ([`Slot::MAX_PAYLOAD`] bytes).
///
/// # Free Slots
/// Deleted slots are rewritten as [`SlotType::Free`] and kept on an
/// in-memory free list that `insert` pops from. The list is rebuilt by
/// scanning slot headers on open.
///
/// # Thread Safety
/// The file handle and free list sit behind one `parking_lot::Mutex`, so
/// every operation is serialised.
///
/// # Durability
/// With [`FileStoreConfig::sync_writes`] set (the default) every write is
/// followed by `fsync()`. Otherwise call [`FileStore::sync`] explicitly.
pub struct FileStore {
    inner: Mutex<FileInner>,
    config: FileStoreConfig,
    stats: StoreStats,
}

struct FileInner {
    file: File,
    /// Number of slots in the file.
    slot_count: u64,
    /// Indices of reusable slots (LIFO).
    free: Vec<u64>,
}

impl FileStore {
    /// Create a new store file with default options.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with(path, FileStoreConfig::default())
    }

    /// Create a new store file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create_with<P: AsRef<Path>>(path: P, config: FileStoreConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        info!(path = %path.as_ref().display(), "created file store");

        Ok(Self {
            inner: Mutex::new(FileInner {
                file,
                slot_count: 0,
                free: Vec::new(),
            }),
            config,
            stats: StoreStats::new(),
        })
    }

    /// Open an existing store file with default options.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, FileStoreConfig::default())
    }

    /// Open an existing store file, rebuilding the free list.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open_with<P: AsRef<Path>>(path: P, config: FileStoreConfig) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;

        // A torn trailing slot is ignored
        let slot_count = file.metadata()?.len() / SLOT_SIZE as u64;

        let mut free = Vec::new();
        for index in 0..slot_count {
            file.seek(SeekFrom::Start(index * SLOT_SIZE as u64))?;
            let mut tag = [0u8; 1];
            file.read_exact(&mut tag)?;
            if SlotType::from_u8(tag[0]).is_reusable() {
                free.push(index);
            }
        }
        // Lowest index is popped first
        free.reverse();

        info!(
            path = %path.as_ref().display(),
            slots = slot_count,
            free = free.len(),
            "opened file store"
        );

        Ok(Self {
            inner: Mutex::new(FileInner {
                file,
                slot_count,
                free,
            }),
            config,
            stats: StoreStats::new(),
        })
    }

    /// Open an existing store file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Flush all written slots to disk.
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }

    /// Get the number of slots in the file, live or free.
    pub fn slot_count(&self) -> u64 {
        self.inner.lock().slot_count
    }

    /// Get the number of slots waiting to be reused.
    pub fn free_slot_count(&self) -> usize {
        self.inner.lock().free.len()
    }

    /// Get the total size of the store file in bytes.
    pub fn file_size(&self) -> u64 {
        self.slot_count() * SLOT_SIZE as u64
    }

    /// Operation counters.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    // ========================================================================
    // Internal: slot I/O
    // ========================================================================

    /// Map a record id onto a slot index, rejecting ids past the end.
    fn slot_index(inner: &FileInner, id: RecordId) -> Result<u64> {
        if !id.is_valid() || id.0 > inner.slot_count {
            return Err(Error::RecordNotFound(id));
        }
        Ok(id.0 - 1)
    }

    fn read_slot(inner: &mut FileInner, index: u64) -> Result<Slot> {
        inner.file.seek(SeekFrom::Start(index * SLOT_SIZE as u64))?;
        let mut slot = Slot::new();
        inner.file.read_exact(slot.as_mut_slice())?;
        Ok(slot)
    }

    fn read_slot_type(inner: &mut FileInner, index: u64) -> Result<SlotType> {
        inner.file.seek(SeekFrom::Start(index * SLOT_SIZE as u64))?;
        let mut tag = [0u8; 1];
        inner.file.read_exact(&mut tag)?;
        Ok(SlotType::from_u8(tag[0]))
    }

    fn write_slot(&self, inner: &mut FileInner, index: u64, slot: &Slot) -> Result<()> {
        inner.file.seek(SeekFrom::Start(index * SLOT_SIZE as u64))?;
        inner.file.write_all(slot.as_slice())?;
        if self.config.sync_writes {
            inner.file.sync_all()?;
        }
        Ok(())
    }

    /// Fail with `RecordNotFound` unless slot `index` holds a live record.
    fn require_live(inner: &mut FileInner, index: u64, id: RecordId) -> Result<()> {
        match Self::read_slot_type(inner, index)? {
            SlotType::Record => Ok(()),
            _ => Err(Error::RecordNotFound(id)),
        }
    }
}

impl RecordStore for FileStore {
    fn fetch(&self, id: RecordId) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        let index = Self::slot_index(&inner, id)?;
        let slot = Self::read_slot(&mut inner, index)?;
        drop(inner);

        if slot.header().slot_type != SlotType::Record {
            return Err(Error::RecordNotFound(id));
        }
        if !slot.verify_checksum() {
            return Err(Error::ChecksumMismatch(id));
        }

        let data = slot.payload()?.to_vec();
        trace!(%id, len = data.len(), "fetch");
        self.stats.record_fetch(data.len());
        Ok(data)
    }

    fn insert(&self, data: &[u8]) -> Result<RecordId> {
        let slot = Slot::with_record(data)?;

        let mut inner = self.inner.lock();
        let (index, appended) = match inner.free.pop() {
            Some(index) => (index, false),
            None => {
                let index = inner.slot_count;
                inner.slot_count += 1;
                (index, true)
            }
        };

        if let Err(err) = self.write_slot(&mut inner, index, &slot) {
            if appended {
                inner.slot_count -= 1;
            } else {
                // Slot content is unknown; offer it again
                inner.free.push(index);
            }
            return Err(err);
        }
        drop(inner);

        let id = RecordId::new(index + 1);
        trace!(%id, len = data.len(), "insert");
        self.stats.record_insert(data.len());
        Ok(id)
    }

    fn update(&self, id: RecordId, data: &[u8]) -> Result<()> {
        let slot = Slot::with_record(data)?;

        let mut inner = self.inner.lock();
        let index = Self::slot_index(&inner, id)?;
        Self::require_live(&mut inner, index, id)?;
        self.write_slot(&mut inner, index, &slot)?;
        drop(inner);

        trace!(%id, len = data.len(), "update");
        self.stats.record_update(data.len());
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        let mut inner = self.inner.lock();
        let index = Self::slot_index(&inner, id)?;
        Self::require_live(&mut inner, index, id)?;
        self.write_slot(&mut inner, index, &Slot::free())?;
        inner.free.push(index);
        drop(inner);

        trace!(%id, "delete");
        self.stats.record_delete();
        Ok(())
    }
}
