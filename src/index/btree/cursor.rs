//! Bidirectional traversal of the leaf chain.

use super::page::{Page, Pager};
use crate::common::{Error, Result};

/// A position between two entries of a tree.
///
/// `next()` returns the entry after the position and moves past it;
/// `previous()` returns the entry before it and moves back. Calling `next()`
/// right after `previous()` yields the same entry again.
///
/// A cursor holds one leaf at a time and loads neighbours lazily. It borrows
/// the tree, so the tree cannot change underneath it.
///
/// # Example
/// ```
/// use pagetree::{BTree, MemoryStore};
///
/// let mut tree: BTree<u32, u32, _> = BTree::create(MemoryStore::new(), Default::default()).unwrap();
/// for i in 0..50 {
///     tree.insert(i, i * 2, false).unwrap();
/// }
///
/// let mut cursor = tree.browse_from(&40).unwrap();
/// assert_eq!(cursor.next().unwrap(), Some((40, 80)));
/// assert_eq!(cursor.previous().unwrap(), Some((40, 80)));
/// assert_eq!(cursor.previous().unwrap(), Some((39, 78)));
/// ```
pub struct Cursor<'a, K, V> {
    pager: Pager<'a, K, V>,
    page: Option<Page<K, V>>,
    /// Slot of the entry `next()` returns.
    index: usize,
}

impl<'a, K: Clone, V: Clone> Cursor<'a, K, V> {
    pub(crate) fn new(pager: Pager<'a, K, V>, page: Option<Page<K, V>>, index: usize) -> Self {
        Self { pager, page, index }
    }

    /// The entry after the cursor, or `None` at the end of the tree.
    pub fn next(&mut self) -> Result<Option<(K, V)>> {
        loop {
            let Some(page) = &self.page else {
                return Ok(None);
            };

            if self.index < page.page_size() {
                let Some(key) = page.key_at(self.index) else {
                    return Ok(None);
                };
                let entry = entry(page, self.index, key)?;
                self.index += 1;
                return Ok(Some(entry));
            }

            let next = page.next();
            if !next.is_valid() {
                return Ok(None);
            }
            let page = self.pager.load(next)?;
            self.index = page.first();
            self.page = Some(page);
        }
    }

    /// The entry before the cursor, or `None` at the start of the tree.
    pub fn previous(&mut self) -> Result<Option<(K, V)>> {
        loop {
            let Some(page) = &self.page else {
                return Ok(None);
            };

            if self.index > page.first() {
                self.index -= 1;
                match page.key_at(self.index) {
                    Some(key) => return entry(page, self.index, key).map(Some),
                    // +inf slot
                    None => continue,
                }
            }

            let previous = page.previous();
            if !previous.is_valid() {
                return Ok(None);
            }
            let page = self.pager.load(previous)?;
            self.index = page.page_size();
            self.page = Some(page);
        }
    }

    /// Drain the remaining entries going forward.
    pub fn collect_forward(mut self) -> Result<Vec<(K, V)>> {
        let mut entries = Vec::new();
        while let Some(item) = self.next()? {
            entries.push(item);
        }
        Ok(entries)
    }

    /// Drain the remaining entries going backward.
    pub fn collect_backward(mut self) -> Result<Vec<(K, V)>> {
        let mut entries = Vec::new();
        while let Some(item) = self.previous()? {
            entries.push(item);
        }
        Ok(entries)
    }
}

fn entry<K: Clone, V: Clone>(page: &Page<K, V>, index: usize, key: &K) -> Result<(K, V)> {
    match page.value_at(index) {
        Some(value) => Ok((key.clone(), value.clone())),
        None => Err(Error::Corrupted(format!(
            "page {} slot {} has no value",
            page.id(),
            index
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::{BTree, MemoryStore, TreeOptions};

    fn tree(count: u32) -> BTree<u32, u32, MemoryStore> {
        let options = TreeOptions::default().with_page_size(4).unwrap();
        let mut tree = BTree::create(MemoryStore::new(), options).unwrap();
        for k in 0..count {
            tree.insert(k, k + 100, false).unwrap();
        }
        tree
    }

    #[test]
    fn test_empty_tree_cursor() {
        let tree = tree(0);
        let mut cursor = tree.browse().unwrap();
        assert_eq!(cursor.next().unwrap(), None);
        assert_eq!(cursor.previous().unwrap(), None);

        let mut cursor = tree.browse_last().unwrap();
        assert_eq!(cursor.previous().unwrap(), None);
    }

    #[test]
    fn test_single_leaf_skips_infinity_slot() {
        let tree = tree(2);
        assert_eq!(tree.height(), 0);

        let mut cursor = tree.browse_last().unwrap();
        assert_eq!(cursor.previous().unwrap(), Some((1, 101)));
        assert_eq!(cursor.previous().unwrap(), Some((0, 100)));
        assert_eq!(cursor.previous().unwrap(), None);
        assert_eq!(cursor.next().unwrap(), Some((0, 100)));
        assert_eq!(cursor.next().unwrap(), Some((1, 101)));
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn test_direction_change_across_page_boundary() {
        let tree = tree(40);
        assert!(tree.height() >= 1);

        // walk the whole chain forward, turning back at every step
        let mut cursor = tree.browse().unwrap();
        for k in 0..40 {
            assert_eq!(cursor.next().unwrap(), Some((k, k + 100)));
            assert_eq!(cursor.previous().unwrap(), Some((k, k + 100)));
            assert_eq!(cursor.next().unwrap(), Some((k, k + 100)));
        }
        assert_eq!(cursor.next().unwrap(), None);

        for k in (0..40).rev() {
            assert_eq!(cursor.previous().unwrap(), Some((k, k + 100)));
        }
        assert_eq!(cursor.previous().unwrap(), None);
    }

    #[test]
    fn test_browse_from_between_keys() {
        let options = TreeOptions::default().with_page_size(4).unwrap();
        let mut tree = BTree::create(MemoryStore::new(), options).unwrap();
        for k in (0..30u32).map(|k| k * 10) {
            tree.insert(k, k, false).unwrap();
        }

        let mut cursor = tree.browse_from(&55).unwrap();
        assert_eq!(cursor.next().unwrap(), Some((60, 60)));

        let mut cursor = tree.browse_from(&55).unwrap();
        assert_eq!(cursor.previous().unwrap(), Some((50, 50)));

        let mut cursor = tree.browse_from(&1000).unwrap();
        assert_eq!(cursor.next().unwrap(), None);
        assert_eq!(cursor.previous().unwrap(), Some((290, 290)));
    }
}
