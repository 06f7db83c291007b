//! Record store statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters kept by every store in this crate.
///
/// All fields are atomic so stores can count from `&self` without locks.
/// `Ordering::Relaxed` is enough: counters are independent and only need
/// to be eventually consistent.
///
/// # Example
/// ```
/// use pagetree::StoreStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = StoreStats::new();
/// stats.fetches.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.fetches.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug)]
pub struct StoreStats {
    /// Records read.
    pub fetches: AtomicU64,

    /// Records created.
    pub inserts: AtomicU64,

    /// Records overwritten.
    pub updates: AtomicU64,

    /// Records deleted.
    pub deletes: AtomicU64,

    /// Payload bytes returned by fetches.
    pub bytes_read: AtomicU64,

    /// Payload bytes accepted by inserts and updates.
    pub bytes_written: AtomicU64,
}

impl StoreStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            fetches: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_fetch(&self, bytes: usize) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self, bytes: usize) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self, bytes: usize) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    ///
    /// This returns a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.fetches.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.updates.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
    }
}

impl Default for StoreStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of store statistics.
///
/// Unlike `StoreStats`, this is a plain value that can be printed,
/// compared and diffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub fetches: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl StatsSnapshot {
    /// Total number of store round-trips.
    pub fn operations(&self) -> u64 {
        self.fetches + self.inserts + self.updates + self.deletes
    }

    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            fetches: self.fetches - earlier.fetches,
            inserts: self.inserts - earlier.inserts,
            updates: self.updates - earlier.updates,
            deletes: self.deletes - earlier.deletes,
            bytes_read: self.bytes_read - earlier.bytes_read,
            bytes_written: self.bytes_written - earlier.bytes_written,
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ fetches: {}, inserts: {}, updates: {}, deletes: {}, read: {}B, written: {}B }}",
            self.fetches,
            self.inserts,
            self.updates,
            self.deletes,
            self.bytes_read,
            self.bytes_written
        )
    }
}
