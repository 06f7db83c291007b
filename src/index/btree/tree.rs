//! The tree driver: root bookkeeping and the persisted header record.

use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, info};

use super::codec::{ByteReader, Codec, NativeCodec, NativeEncoding};
use super::comparator::{compare_slots, Comparator, NaturalOrder};
use super::cursor::Cursor;
use super::page::{InsertOutcome, Page, Pager, RemoveOutcome};
use crate::common::config::BTreeConfig;
use crate::common::{Error, RecordId, Result};
use crate::storage::RecordStore;

/// "BPTR"
const HEADER_MAGIC: u32 = 0x4250_5452;

/// Per-tree configuration: page size, key order and codecs.
///
/// The default orders keys naturally and stores keys and values in their
/// native form.
///
/// # Example
/// ```
/// use pagetree::{NaturalOrder, Reversed, TreeOptions, Utf8Codec};
///
/// let options = TreeOptions::<String, u64>::default()
///     .with_page_size(32)
///     .unwrap()
///     .with_comparator(Reversed(NaturalOrder))
///     .with_key_codec(Utf8Codec);
/// assert_eq!(options.config().page_size(), 32);
/// ```
pub struct TreeOptions<K, V> {
    config: BTreeConfig,
    comparator: Box<dyn Comparator<K>>,
    key_codec: Box<dyn Codec<K>>,
    value_codec: Box<dyn Codec<V>>,
}

impl<K, V> TreeOptions<K, V> {
    pub fn new<C, KC, VC>(comparator: C, key_codec: KC, value_codec: VC) -> Self
    where
        C: Comparator<K> + 'static,
        KC: Codec<K> + 'static,
        VC: Codec<V> + 'static,
    {
        Self {
            config: BTreeConfig::default(),
            comparator: Box::new(comparator),
            key_codec: Box::new(key_codec),
            value_codec: Box::new(value_codec),
        }
    }

    pub fn with_config(mut self, config: BTreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for `with_config(BTreeConfig::new(page_size)?)`.
    pub fn with_page_size(self, page_size: usize) -> Result<Self> {
        Ok(self.with_config(BTreeConfig::new(page_size)?))
    }

    pub fn with_comparator<C: Comparator<K> + 'static>(mut self, comparator: C) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    pub fn with_key_codec<C: Codec<K> + 'static>(mut self, codec: C) -> Self {
        self.key_codec = Box::new(codec);
        self
    }

    pub fn with_value_codec<C: Codec<V> + 'static>(mut self, codec: C) -> Self {
        self.value_codec = Box::new(codec);
        self
    }

    #[inline]
    pub fn config(&self) -> BTreeConfig {
        self.config
    }

    pub(crate) fn comparator(&self) -> &dyn Comparator<K> {
        self.comparator.as_ref()
    }

    pub(crate) fn key_codec(&self) -> &dyn Codec<K> {
        self.key_codec.as_ref()
    }

    pub(crate) fn value_codec(&self) -> &dyn Codec<V> {
        self.value_codec.as_ref()
    }
}

impl<K: Ord + NativeEncoding, V: NativeEncoding> Default for TreeOptions<K, V> {
    fn default() -> Self {
        Self::new(NaturalOrder, NativeCodec, NativeCodec)
    }
}

impl<K, V> fmt::Debug for TreeOptions<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A B+Tree stored page by page in a [`RecordStore`].
///
/// The tree keeps its own state (page size, height, root, entry count) in a
/// header record of the same store, so it can be reopened with
/// [`BTree::load`].
///
/// Mutations take `&mut self`: there is one writer at a time, and cursors
/// (which borrow the tree) never observe a half-done change.
///
/// # Example
/// ```
/// use pagetree::{BTree, MemoryStore, TreeOptions};
///
/// let options = TreeOptions::default().with_page_size(4).unwrap();
/// let mut tree: BTree<u64, String, _> = BTree::create(MemoryStore::new(), options).unwrap();
///
/// tree.insert(2, "two".to_string(), false).unwrap();
/// tree.insert(1, "one".to_string(), false).unwrap();
/// assert_eq!(tree.find(&2).unwrap(), Some("two".to_string()));
///
/// assert_eq!(tree.remove(&1).unwrap(), "one");
/// assert_eq!(tree.len(), 1);
/// ```
pub struct BTree<K, V, S: RecordStore> {
    store: S,
    options: TreeOptions<K, V>,
    header_id: RecordId,
    /// Internal levels above the leaves.
    height: u32,
    root: RecordId,
    entries: u64,
}

impl<K: Clone, V: Clone, S: RecordStore> BTree<K, V, S> {
    /// Create an empty tree and write its header record.
    pub fn create(store: S, options: TreeOptions<K, V>) -> Result<Self> {
        let mut tree = Self {
            store,
            options,
            header_id: RecordId::NONE,
            height: 0,
            root: RecordId::NONE,
            entries: 0,
        };
        tree.header_id = tree.store.insert(&tree.encode_header())?;

        info!(
            header = %tree.header_id,
            page_size = tree.page_size(),
            "created B+Tree"
        );
        Ok(tree)
    }

    /// Reopen the tree whose header record is `header_id`.
    ///
    /// The page size stored in the header replaces the one in `options`.
    ///
    /// # Errors
    /// `Error::Corrupted` if the record is not a tree header.
    pub fn load(store: S, header_id: RecordId, options: TreeOptions<K, V>) -> Result<Self> {
        let bytes = store.fetch(header_id)?;
        let mut input = ByteReader::new(&bytes);

        let magic = input.read_u32()?;
        if magic != HEADER_MAGIC {
            return Err(Error::Corrupted(format!(
                "record {} is not a tree header (magic {:#x})",
                header_id, magic
            )));
        }
        let page_size = input.read_u32()? as usize;
        let height = input.read_u32()?;
        let root = RecordId::from_le_bytes(input.read_array()?);
        let entries = input.read_u64()?;
        input.finish()?;

        let mut options = options;
        if page_size != options.config().page_size() {
            debug!(
                configured = options.config().page_size(),
                stored = page_size,
                "using stored page size"
            );
            options = options.with_page_size(page_size)?;
        }

        info!(header = %header_id, %root, height, entries, "loaded B+Tree");
        Ok(Self {
            store,
            options,
            header_id,
            height,
            root,
            entries,
        })
    }

    fn encode_header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(28);
        out.extend_from_slice(&HEADER_MAGIC.to_le_bytes());
        out.extend_from_slice(&(self.page_size() as u32).to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.root.to_le_bytes());
        out.extend_from_slice(&self.entries.to_le_bytes());
        out
    }

    fn save_header(&self) -> Result<()> {
        self.store.update(self.header_id, &self.encode_header())
    }

    fn pager(&self) -> Pager<'_, K, V> {
        Pager::new(&self.store, &self.options)
    }

    /// Insert `value` under `key`.
    ///
    /// If the key is already present its value is kept, unless `replace` is
    /// set, and the previous value is returned.
    pub fn insert(&mut self, key: K, value: V, replace: bool) -> Result<Option<V>> {
        let page_size = self.page_size();
        let pager = Pager::new(&self.store, &self.options);

        if !self.root.is_valid() {
            let mut root = Page::root_leaf(page_size, key, value);
            pager.create(&mut root)?;
            self.root = root.id();
            self.height = 0;
            self.entries = 1;
            self.save_header()?;

            debug!(root = %self.root, "created root leaf");
            return Ok(None);
        }

        let mut root = pager.load(self.root)?;
        match root.insert(pager, self.height, key, value, replace)? {
            InsertOutcome::Existing(existing) => return Ok(Some(existing)),
            InsertOutcome::Done => {}
            InsertOutcome::Overflow(sibling) => {
                let mut new_root = Page::new_root(
                    page_size,
                    (sibling.largest_key().cloned(), sibling.id()),
                    (root.largest_key().cloned(), root.id()),
                );
                pager.create(&mut new_root)?;
                self.root = new_root.id();
                self.height += 1;

                debug!(root = %self.root, height = self.height, "grew tree");
            }
        }

        self.entries += 1;
        self.save_header()?;
        Ok(None)
    }

    /// Remove `key` and return its value.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if the key is absent.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        if !self.root.is_valid() {
            return Err(Error::KeyNotFound);
        }
        if self.entries == 0 {
            return Err(Error::Corrupted(format!(
                "header {} counts no entries under root {}",
                self.header_id, self.root
            )));
        }
        let pager = Pager::new(&self.store, &self.options);

        let mut root = pager.load(self.root)?;
        let outcome = root.remove(pager, self.height, key)?;
        let underflow = matches!(outcome, RemoveOutcome::Underflow(_));

        if underflow && root.is_empty() {
            if self.height == 0 {
                self.root = RecordId::NONE;
            } else {
                self.root = root.child_at(root.page_size() - 1)?;
                self.height -= 1;
            }
            pager.delete(root.id())?;

            debug!(old = %root.id(), root = %self.root, height = self.height, "collapsed root");
        }

        self.entries -= 1;
        self.save_header()?;
        Ok(outcome.into_value())
    }

    /// Value stored under `key`.
    pub fn find(&self, key: &K) -> Result<Option<V>> {
        let found = self.find_greater_or_equal(key)?;
        Ok(found.and_then(|(found, value)| {
            (self.options.comparator().compare(&found, key) == Ordering::Equal).then_some(value)
        }))
    }

    /// The smallest entry whose key is `>= key`.
    pub fn find_greater_or_equal(&self, key: &K) -> Result<Option<(K, V)>> {
        self.browse_from(key)?.next()
    }

    /// Cursor before the smallest entry.
    pub fn browse(&self) -> Result<Cursor<'_, K, V>> {
        match self.load_root()? {
            Some(root) => root.find_first(self.pager(), self.height),
            None => Ok(Cursor::new(self.pager(), None, 0)),
        }
    }

    /// Cursor before the smallest entry `>= key`.
    pub fn browse_from(&self, key: &K) -> Result<Cursor<'_, K, V>> {
        match self.load_root()? {
            Some(root) => root.find(self.pager(), self.height, key),
            None => Ok(Cursor::new(self.pager(), None, 0)),
        }
    }

    /// Cursor after the largest entry; walk it with `previous()`.
    pub fn browse_last(&self) -> Result<Cursor<'_, K, V>> {
        match self.load_root()? {
            Some(root) => root.find_last(self.pager(), self.height),
            None => Ok(Cursor::new(self.pager(), None, 0)),
        }
    }

    fn load_root(&self) -> Result<Option<Page<K, V>>> {
        if !self.root.is_valid() {
            return Ok(None);
        }
        self.pager().load(self.root).map(Some)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Internal levels above the leaves; 0 for a single leaf or no root.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Root page, `RecordId::NONE` when the tree is empty.
    #[inline]
    pub fn root(&self) -> RecordId {
        self.root
    }

    /// Record holding the tree header; pass it to [`BTree::load`].
    #[inline]
    pub fn header_id(&self) -> RecordId {
        self.header_id
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.options.config().page_size()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Check the structure of the whole tree.
    ///
    /// Verifies key order within and across pages, separators, minimum fill
    /// of non-root pages, the leaf chain in both directions and the entry
    /// count.
    ///
    /// # Errors
    /// `Error::Corrupted` describing the first problem found.
    pub fn verify(&self) -> Result<()> {
        let Some(root) = self.load_root()? else {
            if self.entries != 0 || self.height != 0 {
                return Err(Error::Corrupted(format!(
                    "empty tree with {} entries at height {}",
                    self.entries, self.height
                )));
            }
            return Ok(());
        };

        let mut leaves = Vec::new();
        self.verify_page(&root, self.height, true, &mut leaves)?;

        for (i, &(id, previous, next)) in leaves.iter().enumerate() {
            let expected_previous = i.checked_sub(1).map_or(RecordId::NONE, |j| leaves[j].0);
            let expected_next = leaves.get(i + 1).map_or(RecordId::NONE, |leaf| leaf.0);
            if previous != expected_previous || next != expected_next {
                return Err(Error::Corrupted(format!(
                    "leaf {} is linked to {}/{}, expected {}/{}",
                    id, previous, next, expected_previous, expected_next
                )));
            }
        }

        let comparator = self.options.comparator();
        let mut cursor = root.find_first(self.pager(), self.height)?;
        let mut count = 0u64;
        let mut last: Option<K> = None;
        while let Some((key, _)) = cursor.next()? {
            if let Some(last) = &last {
                if comparator.compare(last, &key) != Ordering::Less {
                    return Err(Error::Corrupted("keys out of order".to_string()));
                }
            }
            last = Some(key);
            count += 1;
        }
        if count != self.entries {
            return Err(Error::Corrupted(format!(
                "header counts {} entries, tree holds {}",
                self.entries, count
            )));
        }
        Ok(())
    }

    fn verify_page(
        &self,
        page: &Page<K, V>,
        height: u32,
        rightmost: bool,
        leaves: &mut Vec<(RecordId, RecordId, RecordId)>,
    ) -> Result<()> {
        let corrupted = |what: &str| Err(Error::Corrupted(format!("page {}: {}", page.id(), what)));
        let is_root = page.id() == self.root;
        let comparator = self.options.comparator();

        if page.is_leaf() != (height == 0) {
            return corrupted("wrong kind for its height");
        }
        if is_root && page.is_empty() {
            return corrupted("root holds no entries");
        }
        if !is_root && page.first() > page.page_size() / 2 {
            return corrupted("less than half full");
        }

        let keys = page.keys();
        if keys
            .windows(2)
            .any(|pair| compare_slots(comparator, pair[0].as_ref(), pair[1].as_ref()) != Ordering::Less)
        {
            return corrupted("keys not ascending");
        }
        let last = keys.len() - 1;
        if keys.iter().enumerate().any(|(i, key)| key.is_none() && !(rightmost && i == last)) {
            return corrupted("misplaced +inf key");
        }
        if rightmost && page.largest_key().is_some() {
            return corrupted("rightmost page lacks the +inf key");
        }

        if page.is_leaf() {
            leaves.push((page.id(), page.previous(), page.next()));
            return Ok(());
        }

        let pager = self.pager();
        for i in page.first()..page.page_size() {
            let child = pager.load(page.child_at(i)?)?;
            let separator = page.key_at(i);
            if compare_slots(comparator, separator, child.largest_key()) != Ordering::Equal {
                return corrupted("separator differs from child's largest key");
            }
            self.verify_page(&child, height - 1, rightmost && i == page.page_size() - 1, leaves)?;
        }
        Ok(())
    }
}

impl<K, V, S: RecordStore> fmt::Debug for BTree<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("header_id", &self.header_id)
            .field("root", &self.root)
            .field("height", &self.height)
            .field("entries", &self.entries)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn small_tree() -> BTree<u64, u64, MemoryStore> {
        let options = TreeOptions::default().with_page_size(4).unwrap();
        BTree::create(MemoryStore::new(), options).unwrap()
    }

    fn keys<K: Clone, V: Clone, S: RecordStore>(tree: &BTree<K, V, S>) -> Vec<K> {
        tree.browse()
            .unwrap()
            .collect_forward()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = small_tree();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root(), RecordId::NONE);
        assert_eq!(tree.find(&1).unwrap(), None);
        assert_eq!(tree.browse().unwrap().next().unwrap(), None);
        assert_eq!(tree.browse_last().unwrap().previous().unwrap(), None);
        tree.verify().unwrap();
    }

    #[test]
    fn test_remove_from_empty_tree() {
        let mut tree = small_tree();
        assert!(matches!(tree.remove(&1), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_first_insert_creates_root_leaf() {
        let mut tree = small_tree();
        assert_eq!(tree.insert(7, 70, false).unwrap(), None);

        assert!(tree.root().is_valid());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.len(), 1);

        let root: Page<u64, u64> = tree.pager().load(tree.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.keys(), &[Some(7), None]);
        tree.verify().unwrap();
    }

    #[test]
    fn test_root_split_shape() {
        let mut tree = small_tree();
        for k in 1..=5 {
            tree.insert(k, k * 10, false).unwrap();
        }

        assert_eq!(tree.height(), 1);
        let pager = tree.pager();
        let root = pager.load(tree.root()).unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.keys(), &[Some(2), None]);

        let children = root.children().unwrap();
        let left = pager.load(children[0]).unwrap();
        let right = pager.load(children[1]).unwrap();
        assert_eq!(left.keys(), &[Some(1), Some(2)]);
        assert_eq!(right.keys(), &[Some(3), Some(4), Some(5), None]);
        assert_eq!(left.next(), right.id());
        assert_eq!(right.previous(), left.id());
        tree.verify().unwrap();
    }

    #[test]
    fn test_remove_until_empty() {
        let mut tree = small_tree();
        for k in 0..40 {
            tree.insert(k, k, false).unwrap();
        }
        assert!(tree.height() >= 2);

        for k in 0..40 {
            assert_eq!(tree.remove(&k).unwrap(), k);
            tree.verify().unwrap();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root(), RecordId::NONE);
        // only the header is left
        assert_eq!(tree.store().len(), 1);
    }

    #[test]
    fn test_remove_missing_key_changes_nothing() {
        let mut tree = small_tree();
        for k in (0..20).map(|k| k * 2) {
            tree.insert(k, k, false).unwrap();
        }
        let before = tree.store().snapshot();

        assert!(matches!(tree.remove(&7), Err(Error::KeyNotFound)));
        assert!(matches!(tree.remove(&100), Err(Error::KeyNotFound)));
        assert_eq!(tree.store().snapshot(), before);
        assert_eq!(tree.len(), 20);
    }

    #[test]
    fn test_replace() {
        let mut tree = small_tree();
        tree.insert(1, 10, false).unwrap();

        assert_eq!(tree.insert(1, 11, false).unwrap(), Some(10));
        assert_eq!(tree.find(&1).unwrap(), Some(10));

        assert_eq!(tree.insert(1, 12, true).unwrap(), Some(10));
        assert_eq!(tree.find(&1).unwrap(), Some(12));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_find_greater_or_equal() {
        let mut tree = small_tree();
        for k in (0..30).map(|k| k * 10) {
            tree.insert(k, k + 1, false).unwrap();
        }

        assert_eq!(tree.find_greater_or_equal(&0).unwrap(), Some((0, 1)));
        assert_eq!(tree.find_greater_or_equal(&15).unwrap(), Some((20, 21)));
        assert_eq!(tree.find_greater_or_equal(&290).unwrap(), Some((290, 291)));
        assert_eq!(tree.find_greater_or_equal(&291).unwrap(), None);
        assert_eq!(tree.find(&15).unwrap(), None);
    }

    #[test]
    fn test_reverse_insertion_and_browse_last() {
        let mut tree = small_tree();
        for k in (0..25).rev() {
            tree.insert(k, k, false).unwrap();
        }
        tree.verify().unwrap();

        assert_eq!(keys(&tree), (0..25).collect::<Vec<_>>());
        let backward: Vec<u64> = tree
            .browse_last()
            .unwrap()
            .collect_backward()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(backward, (0..25).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_custom_comparator() {
        let options = TreeOptions::<u64, u64>::default()
            .with_page_size(4)
            .unwrap()
            .with_comparator(crate::Reversed(NaturalOrder));
        let mut tree = BTree::create(MemoryStore::new(), options).unwrap();
        for k in 0..10 {
            tree.insert(k, k, false).unwrap();
        }
        tree.verify().unwrap();
        assert_eq!(keys(&tree), (0..10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_load_from_header() {
        let mut tree = small_tree();
        for k in 0..12 {
            tree.insert(k, k * 3, false).unwrap();
        }
        let header = tree.header_id();
        let height = tree.height();
        let store = tree.into_store();

        // stored page size wins over the configured one
        let tree: BTree<u64, u64, _> = BTree::load(store, header, TreeOptions::default()).unwrap();
        assert_eq!(tree.page_size(), 4);
        assert_eq!(tree.height(), height);
        assert_eq!(tree.len(), 12);
        assert_eq!(tree.find(&11).unwrap(), Some(33));
        tree.verify().unwrap();
    }

    #[test]
    fn test_load_rejects_non_header() {
        let store = MemoryStore::new();
        let id = store.insert(&[0u8; 28]).unwrap();
        let result: Result<BTree<u64, u64, _>> = BTree::load(store, id, TreeOptions::default());
        assert!(matches!(result, Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_verify_detects_bad_count() {
        let mut tree = small_tree();
        for k in 0..10 {
            tree.insert(k, k, false).unwrap();
        }
        tree.entries = 11;
        assert!(matches!(tree.verify(), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_remove_with_zero_count_is_corrupted() {
        let mut tree = small_tree();
        for k in 0..10 {
            tree.insert(k, k, false).unwrap();
        }
        let before = tree.store().snapshot();

        tree.entries = 0;
        assert!(matches!(tree.remove(&3), Err(Error::Corrupted(_))));
        assert_eq!(tree.store().snapshot(), before);
        assert_eq!(tree.find(&3).unwrap(), Some(3));
    }
}
