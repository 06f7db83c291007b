//! pagetree - A B+Tree page engine on top of a record store.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pagetree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Tree driver (index/btree/tree)              │   │
//! │  │   root + height + entry count, kept in a header record   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Pages (index/btree/page, cursor)            │   │
//! │  │   find | insert + split | remove + borrow/merge         │   │
//! │  │   leaves linked both ways, walked by Cursor              │   │
//! │  │   keys ordered by a Comparator, encoded by a Codec       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Record stores (storage/)                    │   │
//! │  │   RecordStore: fetch | insert | update | delete         │   │
//! │  │   MemoryStore (HashMap)  |  FileStore (4KB CRC slots)    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (RecordId, Error, config)
//! - [`storage`] - Record stores and their slot format
//! - [`index`] - The B+Tree
//!
//! # Quick Start
//! ```
//! use pagetree::{BTree, MemoryStore, TreeOptions};
//!
//! let mut tree: BTree<u64, String, _> =
//!     BTree::create(MemoryStore::new(), TreeOptions::default()).unwrap();
//!
//! for (k, v) in [(3, "c"), (1, "a"), (2, "b")] {
//!     tree.insert(k, v.to_string(), false).unwrap();
//! }
//!
//! let mut cursor = tree.browse().unwrap();
//! while let Some((key, value)) = cursor.next().unwrap() {
//!     println!("{key} = {value}");
//! }
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BTreeConfig, FileStoreConfig, DEFAULT_PAGE_SIZE, SLOT_SIZE};
pub use common::{Error, RecordId, Result};

pub use index::btree::{
    BTree, Codec, Comparator, Cursor, NativeCodec, NativeEncoding, NaturalOrder, RawBytesCodec,
    Reversed, TreeOptions, Utf8Codec,
};
pub use storage::{FileStore, MemoryStore, RecordStore, StatsSnapshot, StoreStats};
