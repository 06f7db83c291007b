//! Configuration for pagetree.

use super::{Error, Result};

/// Size of one slot in a [`FileStore`](crate::storage::FileStore) (4KB).
///
/// Matches the OS page size on most systems. Every record, tree page or
/// header, is written into exactly one slot, so this also bounds the
/// encoded size of a tree page.
pub const SLOT_SIZE: usize = 4096;

/// Number of entries per tree page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 16;

/// Smallest usable page size. Below this a split cannot leave both halves
/// with at least two entries.
pub const MIN_PAGE_SIZE: usize = 4;

/// Largest page size accepted; keeps `first` representable in the 4-byte
/// wire field with plenty of headroom.
pub const MAX_PAGE_SIZE: usize = 1 << 16;

/// Tree shape configuration.
///
/// # Example
/// ```
/// use pagetree::BTreeConfig;
///
/// let config = BTreeConfig::new(32).unwrap();
/// assert_eq!(config.page_size(), 32);
/// assert!(BTreeConfig::new(7).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeConfig {
    page_size: usize,
}

impl BTreeConfig {
    /// Create a configuration with `page_size` entries per page.
    ///
    /// # Errors
    /// `Error::InvalidConfig` unless `page_size` is even and within
    /// `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size < MIN_PAGE_SIZE || page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "page size {} outside [{}, {}]",
                page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        if page_size % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "page size {} must be even",
                page_size
            )));
        }
        Ok(Self { page_size })
    }

    /// Entries per page.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Minimum fill of a non-root page.
    #[inline]
    pub fn half(&self) -> usize {
        self.page_size / 2
    }
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Options for [`FileStore`](crate::storage::FileStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStoreConfig {
    /// `fsync()` after every slot write.
    ///
    /// On by default. Tests and bulk loads turn it off and call
    /// `FileStore::sync` once at the end.
    pub sync_writes: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self { sync_writes: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_size_is_power_of_two() {
        assert!(SLOT_SIZE.is_power_of_two());
        assert_eq!(SLOT_SIZE, 4096);
    }

    #[test]
    fn test_default_config() {
        let config = BTreeConfig::default();
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.half(), DEFAULT_PAGE_SIZE / 2);
        assert!(FileStoreConfig::default().sync_writes);
    }

    #[test]
    fn test_page_size_validation() {
        assert!(BTreeConfig::new(4).is_ok());
        assert!(BTreeConfig::new(2).is_err());
        assert!(BTreeConfig::new(5).is_err());
        assert!(BTreeConfig::new(MAX_PAGE_SIZE).is_ok());
        assert!(BTreeConfig::new(MAX_PAGE_SIZE + 2).is_err());
    }
}
