//! B+Tree index.
//!
//! # Layout
//! - [`page`] - Tree nodes: search, insert/split, remove/rebalance, wire format
//! - [`cursor`] - Ordered traversal over the leaf chain
//! - [`tree`] - The driver owning root, height and the header record
//! - [`comparator`] - Key order
//! - [`codec`] - Key/value serialization
//!
//! Pages address each other only by [`RecordId`](crate::RecordId); every
//! page access goes through the tree's [`RecordStore`](crate::RecordStore).

pub mod codec;
pub mod comparator;
mod cursor;
pub mod page;
mod tree;

pub use codec::{ByteReader, Codec, NativeCodec, NativeEncoding, RawBytesCodec, Utf8Codec};
pub use comparator::{Comparator, NaturalOrder, Reversed};
pub use cursor::Cursor;
pub use page::{InsertOutcome, Page, PageKind, Payload, RemoveOutcome};
pub use tree::{BTree, TreeOptions};
