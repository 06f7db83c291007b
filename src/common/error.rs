//! Error types for pagetree.

use thiserror::Error;

use super::RecordId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pagetree.
///
/// Store, codec and I/O failures are passed through unchanged; the engine
/// performs no recovery of its own. Broken internal invariants are not
/// represented here: they panic.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store has no record under this identifier.
    #[error("Record {0} not found")]
    RecordNotFound(RecordId),

    /// A record does not fit into a single store slot.
    #[error("Record of {len} bytes exceeds the {max} byte slot payload")]
    RecordTooLarge { len: usize, max: usize },

    /// The checksum stored with a record does not match its contents.
    #[error("Checksum mismatch in record {0}")]
    ChecksumMismatch(RecordId),

    /// Attempted to remove a key that is not in the tree.
    ///
    /// This is a caller error, the tree is left untouched.
    #[error("Key not found")]
    KeyNotFound,

    /// A key or value codec failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Persisted bytes could not be decoded, or `verify()` found a broken tree.
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Rejected configuration (page size, header mismatch).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RecordNotFound(RecordId::new(42));
        assert_eq!(format!("{}", err), "Record Record(42) not found");

        let err = Error::KeyNotFound;
        assert_eq!(format!("{}", err), "Key not found");

        let err = Error::RecordTooLarge { len: 5000, max: 4087 };
        assert_eq!(
            format!("{}", err),
            "Record of 5000 bytes exceeds the 4087 byte slot payload"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::KeyNotFound.source().is_none());
    }
}
