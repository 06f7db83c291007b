//! Record identifier type.

use std::fmt;

/// Identifies a record (a tree page, or the tree header) in a store.
///
/// Stored as 8 bytes on the wire: page children and leaf sibling links are
/// all `RecordId`s.
///
/// # Example
/// ```
/// use pagetree::RecordId;
///
/// let id = RecordId::new(42);
/// assert!(id.is_valid());
/// assert_eq!(id.0, 42);
/// assert!(!RecordId::NONE.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId(pub u64);

impl RecordId {
    /// "No record" sentinel.
    ///
    /// Terminates the leaf chain in both directions and marks an empty tree.
    /// Stores never hand it out.
    pub const NONE: RecordId = RecordId(0);

    /// Create a new RecordId.
    #[inline]
    pub fn new(id: u64) -> Self {
        RecordId(id)
    }

    /// Check if this id names a record (is not the sentinel).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::NONE
    }

    #[inline]
    pub(crate) fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub(crate) fn from_le_bytes(bytes: [u8; 8]) -> Self {
        RecordId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NONE {
            write!(f, "Record(NONE)")
        } else {
            write!(f, "Record({})", self.0)
        }
    }
}
