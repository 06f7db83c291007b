//! B+Tree pages.
//!
//! A page holds up to `page_size` entries in fixed slots. Live entries are
//! right-aligned: slots `[first, page_size)` are occupied, everything below
//! `first` is empty. New entries are inserted by shifting the lower part of
//! the page one slot to the left, so a page is full exactly when
//! `first == 0`.
//!
//! ```text
//!            first
//!              v
//! keys:  [ -, -, 10, 20, 30, None ]    None = +inf, rightmost page only
//! vals:  [ -, -, a,  b,  c,  -    ]    (leaf)
//! kids:  [ -, -, p1, p2, p3, p4   ]    (internal: kids[i] holds keys <= keys[i])
//! ```
//!
//! Leaves are linked through `previous`/`next` in ascending key order.
//!
//! # Rebalancing
//! The structural steps ([`split_into`], [`borrow_from_right`],
//! [`borrow_from_left`], [`merge_into_right`]) only move entries between
//! pages in memory. Loading and persisting the pages involved is done by
//! [`Page::insert`] and [`Page::remove`], so a caller holding its own locks
//! can drive the steps directly.
//!
//! # Wire format
//! ```text
//! is_leaf:u8 | [previous:u64 | next:u64] | first:u32
//!   | key slot * (page_size - first)
//!   | value slot * (page_size - first)     (leaf)
//!   | child:u64  * (page_size - first)     (internal)
//! ```

use std::cmp::Ordering;
use std::mem;

use tracing::debug;

use super::codec::{ByteReader, Codec};
use super::comparator::{compare_slot, compare_slots, Comparator};
use super::cursor::Cursor;
use super::tree::TreeOptions;
use crate::common::{Error, RecordId, Result};
use crate::storage::RecordStore;

/// Entry payload: a leaf value or a child pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<V> {
    Value(Option<V>),
    Child(RecordId),
}

type Entry<K, V> = (Option<K>, Payload<V>);

/// Leaf or internal page contents besides the keys.
#[derive(Debug, Clone, PartialEq)]
pub enum PageKind<V> {
    Leaf {
        values: Vec<Option<V>>,
        previous: RecordId,
        next: RecordId,
    },
    Internal {
        children: Vec<RecordId>,
    },
}

/// A tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<K, V> {
    id: RecordId,
    first: usize,
    keys: Vec<Option<K>>,
    kind: PageKind<V>,
}

/// Result of inserting into a subtree.
#[derive(Debug)]
pub enum InsertOutcome<K, V> {
    /// A new entry was added without splitting this page.
    Done,
    /// The key was already present; carries the previous value.
    Existing(V),
    /// This page was split. The returned sibling holds the lower keys and
    /// needs a separator in the parent.
    Overflow(Page<K, V>),
}

/// Result of removing from a subtree. Both variants carry the removed value.
#[derive(Debug, PartialEq)]
pub enum RemoveOutcome<V> {
    Done(V),
    /// This page now holds fewer than `page_size / 2` entries.
    Underflow(V),
}

impl<V> RemoveOutcome<V> {
    pub fn into_value(self) -> V {
        match self {
            RemoveOutcome::Done(value) | RemoveOutcome::Underflow(value) => value,
        }
    }
}

impl<K, V> Page<K, V> {
    /// Create an empty leaf that is not yet in any store.
    pub fn new_leaf(page_size: usize) -> Self {
        Self {
            id: RecordId::NONE,
            first: page_size,
            keys: empty_slots(page_size),
            kind: PageKind::Leaf {
                values: empty_slots(page_size),
                previous: RecordId::NONE,
                next: RecordId::NONE,
            },
        }
    }

    /// Create an empty internal page that is not yet in any store.
    pub fn new_internal(page_size: usize) -> Self {
        Self {
            id: RecordId::NONE,
            first: page_size,
            keys: empty_slots(page_size),
            kind: PageKind::Internal {
                children: vec![RecordId::NONE; page_size],
            },
        }
    }

    /// First root of a tree: one entry plus the +inf slot.
    pub(crate) fn root_leaf(page_size: usize, key: K, value: V) -> Self {
        let mut page = Self::new_leaf(page_size);
        page.fill(vec![
            (Some(key), Payload::Value(Some(value))),
            (None, Payload::Value(None)),
        ]);
        page
    }

    /// Root above a split: `lower` is the new sibling, `upper` the old root.
    pub(crate) fn new_root(
        page_size: usize,
        lower: (Option<K>, RecordId),
        upper: (Option<K>, RecordId),
    ) -> Self {
        let mut page = Self::new_internal(page_size);
        page.fill(vec![
            (lower.0, Payload::Child(lower.1)),
            (upper.0, Payload::Child(upper.1)),
        ]);
        page
    }

    fn empty_like(&self) -> Self {
        match self.kind {
            PageKind::Leaf { .. } => Self::new_leaf(self.page_size()),
            PageKind::Internal { .. } => Self::new_internal(self.page_size()),
        }
    }

    #[inline]
    pub fn id(&self) -> RecordId {
        self.id
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PageKind::Leaf { .. })
    }

    /// Index of the first live slot.
    #[inline]
    pub fn first(&self) -> usize {
        self.first
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.keys.len()
    }

    /// Number of live slots, the +inf slot included.
    #[inline]
    pub fn len(&self) -> usize {
        self.page_size() - self.first
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.first == 0
    }

    /// No real entries left: at most the +inf slot of a rightmost page, or a
    /// single child. Only meaningful for the root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first + 1 >= self.page_size()
    }

    /// Live keys.
    pub fn keys(&self) -> &[Option<K>] {
        &self.keys[self.first..]
    }

    /// Live values of a leaf.
    pub fn values(&self) -> Option<&[Option<V>]> {
        match &self.kind {
            PageKind::Leaf { values, .. } => Some(&values[self.first..]),
            PageKind::Internal { .. } => None,
        }
    }

    /// Live child pointers of an internal page.
    pub fn children(&self) -> Option<&[RecordId]> {
        match &self.kind {
            PageKind::Internal { children } => Some(&children[self.first..]),
            PageKind::Leaf { .. } => None,
        }
    }

    /// Left neighbour in the leaf chain; `NONE` for internal pages.
    pub fn previous(&self) -> RecordId {
        match self.kind {
            PageKind::Leaf { previous, .. } => previous,
            PageKind::Internal { .. } => RecordId::NONE,
        }
    }

    /// Right neighbour in the leaf chain; `NONE` for internal pages.
    pub fn next(&self) -> RecordId {
        match self.kind {
            PageKind::Leaf { next, .. } => next,
            PageKind::Internal { .. } => RecordId::NONE,
        }
    }

    /// Key of the last slot; `None` is +inf.
    pub fn largest_key(&self) -> Option<&K> {
        self.keys.last().and_then(Option::as_ref)
    }

    pub(crate) fn key_at(&self, index: usize) -> Option<&K> {
        self.keys.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn value_at(&self, index: usize) -> Option<&V> {
        match &self.kind {
            PageKind::Leaf { values, .. } => values.get(index).and_then(Option::as_ref),
            PageKind::Internal { .. } => None,
        }
    }

    pub(crate) fn child_at(&self, index: usize) -> Result<RecordId> {
        match &self.kind {
            PageKind::Internal { children } if index >= self.first => children
                .get(index)
                .copied()
                .filter(RecordId::is_valid)
                .ok_or_else(|| {
                    Error::Corrupted(format!("page {} has no child at slot {}", self.id, index))
                }),
            _ => Err(Error::Corrupted(format!(
                "page {} has no child at slot {}",
                self.id, index
            ))),
        }
    }

    fn set_previous(&mut self, id: RecordId) {
        if let PageKind::Leaf { previous, .. } = &mut self.kind {
            *previous = id;
        }
    }

    fn set_next(&mut self, id: RecordId) {
        if let PageKind::Leaf { next, .. } = &mut self.kind {
            *next = id;
        }
    }

    /// Leftmost slot whose key is `>= key`, or `page_size` if none is.
    pub(crate) fn find_index(&self, comparator: &dyn Comparator<K>, key: &K) -> usize {
        let mut low = self.first;
        let mut high = self.page_size();
        while low < high {
            let mid = low + (high - low) / 2;
            if compare_slot(comparator, self.keys[mid].as_ref(), key) == Ordering::Less {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    fn take_payload(&mut self, index: usize) -> Payload<V> {
        match &mut self.kind {
            PageKind::Leaf { values, .. } => Payload::Value(values[index].take()),
            PageKind::Internal { children } => {
                Payload::Child(mem::replace(&mut children[index], RecordId::NONE))
            }
        }
    }

    fn put_payload(&mut self, index: usize, payload: Payload<V>) {
        match (&mut self.kind, payload) {
            (PageKind::Leaf { values, .. }, Payload::Value(value)) => values[index] = value,
            (PageKind::Internal { children }, Payload::Child(child)) => children[index] = child,
            _ => panic!("payload kind does not match page {}", self.id),
        }
    }

    /// Rotate slots `[start, end)` by one, keys and payloads alike.
    fn rotate(&mut self, start: usize, end: usize, left: bool) {
        fn shift<T>(slots: &mut [T], left: bool) {
            if left {
                slots.rotate_left(1);
            } else {
                slots.rotate_right(1);
            }
        }

        if end - start < 2 {
            return;
        }
        shift(&mut self.keys[start..end], left);
        match &mut self.kind {
            PageKind::Leaf { values, .. } => shift(&mut values[start..end], left),
            PageKind::Internal { children } => shift(&mut children[start..end], left),
        }
    }

    /// Insert before the entry currently at `index`, shifting
    /// `[first, index)` one slot to the left.
    pub(crate) fn insert_at(&mut self, index: usize, key: Option<K>, payload: Payload<V>) {
        assert!(self.first > 0, "insert into full page {}", self.id);
        assert!(index >= self.first && index <= self.page_size());

        self.rotate(self.first - 1, index, true);
        self.first -= 1;
        self.keys[index - 1] = key;
        self.put_payload(index - 1, payload);
    }

    /// Take out the entry at `index`, shifting `[first, index)` one slot to
    /// the right.
    pub(crate) fn remove_at(&mut self, index: usize) -> Entry<K, V> {
        assert!(index >= self.first && index < self.page_size());

        let key = self.keys[index].take();
        let payload = self.take_payload(index);
        self.rotate(self.first, index + 1, false);
        self.first += 1;
        (key, payload)
    }

    /// Take every live entry out, leaving the page empty.
    fn drain(&mut self) -> Vec<Entry<K, V>> {
        let entries = (self.first..self.page_size())
            .map(|i| (self.keys[i].take(), self.take_payload(i)))
            .collect();
        self.first = self.page_size();
        entries
    }

    /// Right-align `entries` into an empty page.
    fn fill(&mut self, entries: Vec<Entry<K, V>>) {
        assert_eq!(self.first, self.page_size(), "fill of non-empty page {}", self.id);
        assert!(
            entries.len() <= self.page_size(),
            "{} entries overflow page {}",
            entries.len(),
            self.id
        );

        self.first = self.page_size() - entries.len();
        for (i, (key, payload)) in (self.first..).zip(entries) {
            self.keys[i] = key;
            self.put_payload(i, payload);
        }
    }

    fn check_kind(&self, height: u32) -> Result<()> {
        if (height == 0) != self.is_leaf() {
            return Err(Error::Corrupted(format!(
                "page {} has the wrong kind for height {}",
                self.id, height
            )));
        }
        Ok(())
    }

    /// Serialize the live part of the page.
    pub fn encode(
        &self,
        key_codec: &dyn Codec<K>,
        value_codec: &dyn Codec<V>,
    ) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match &self.kind {
            PageKind::Leaf { previous, next, .. } => {
                out.push(1);
                out.extend_from_slice(&previous.to_le_bytes());
                out.extend_from_slice(&next.to_le_bytes());
            }
            PageKind::Internal { .. } => out.push(0),
        }
        out.extend_from_slice(&(self.first as u32).to_le_bytes());

        for key in self.keys() {
            key_codec.write_slot(key.as_ref(), &mut out)?;
        }
        match &self.kind {
            PageKind::Leaf { values, .. } => {
                for value in &values[self.first..] {
                    value_codec.write_slot(value.as_ref(), &mut out)?;
                }
            }
            PageKind::Internal { children } => {
                for child in &children[self.first..] {
                    out.extend_from_slice(&child.to_le_bytes());
                }
            }
        }
        Ok(out)
    }

    /// Rebuild a page written by [`Page::encode`].
    ///
    /// # Errors
    /// `Error::Corrupted` if the bytes are malformed, codec errors as
    /// returned by the codecs.
    pub fn decode(
        id: RecordId,
        bytes: &[u8],
        page_size: usize,
        key_codec: &dyn Codec<K>,
        value_codec: &dyn Codec<V>,
    ) -> Result<Self> {
        let mut input = ByteReader::new(bytes);
        let mut page = match input.read_u8()? {
            1 => {
                let mut page = Self::new_leaf(page_size);
                page.set_previous(RecordId::from_le_bytes(input.read_array()?));
                page.set_next(RecordId::from_le_bytes(input.read_array()?));
                page
            }
            0 => Self::new_internal(page_size),
            tag => {
                return Err(Error::Corrupted(format!(
                    "record {} has invalid page tag {}",
                    id, tag
                )))
            }
        };
        page.id = id;

        let first = input.read_u32()? as usize;
        if first > page_size {
            return Err(Error::Corrupted(format!(
                "record {} has first slot {} beyond page size {}",
                id, first, page_size
            )));
        }
        page.first = first;

        for i in first..page_size {
            page.keys[i] = key_codec.read_slot(&mut input)?;
        }
        match &mut page.kind {
            PageKind::Leaf { values, .. } => {
                for (i, value) in values.iter_mut().enumerate().skip(first) {
                    *value = value_codec.read_slot(&mut input)?;
                    if page.keys[i].is_some() && value.is_none() {
                        return Err(Error::Corrupted(format!(
                            "page {} slot {} has no value",
                            id, i
                        )));
                    }
                }
            }
            PageKind::Internal { children } => {
                for child in &mut children[first..] {
                    *child = RecordId::from_le_bytes(input.read_array()?);
                }
            }
        }
        input.finish()?;
        Ok(page)
    }
}

fn empty_slots<T>(page_size: usize) -> Vec<Option<T>> {
    std::iter::repeat_with(|| None).take(page_size).collect()
}

fn steal_count(half: usize, donor_first: usize) -> usize {
    (half - donor_first + 1) / 2
}

/// Split full `page` while inserting `(key, payload)` before slot `index`.
///
/// The `page_size + 1` entries are partitioned: the lowest `page_size / 2`
/// go to the empty `sibling`, the rest stay in `page`. A leaf sibling is
/// linked in front of `page`; the old predecessor still points at `page` and
/// must be updated by the caller.
pub fn split_into<K, V>(
    page: &mut Page<K, V>,
    sibling: &mut Page<K, V>,
    index: usize,
    key: Option<K>,
    payload: Payload<V>,
) {
    assert!(page.is_full(), "split of page {} that is not full", page.id);
    assert_eq!(page.is_leaf(), sibling.is_leaf());

    let half = page.page_size() / 2;
    let mut lower = page.drain();
    lower.insert(index, (key, payload));
    let upper = lower.split_off(half);

    sibling.fill(lower);
    page.fill(upper);

    if page.is_leaf() {
        sibling.set_previous(page.previous());
        sibling.set_next(page.id);
        page.set_previous(sibling.id);
    }
}

/// Move the lowest entries of `right` to the top of its left neighbour
/// `child`. The caller updates the separator of `child`.
pub fn borrow_from_right<K, V>(child: &mut Page<K, V>, right: &mut Page<K, V>) {
    let half = child.page_size() / 2;
    assert!(right.first < half, "page {} has nothing to lend", right.id);

    let steal = steal_count(half, right.first);
    let mut entries = child.drain();
    let mut donor = right.drain();
    let kept = donor.split_off(steal);
    entries.extend(donor);

    child.fill(entries);
    right.fill(kept);
}

/// Move the highest entries of `left` to the bottom of its right neighbour
/// `child`. The caller updates the separator of `left`.
pub fn borrow_from_left<K, V>(left: &mut Page<K, V>, child: &mut Page<K, V>) {
    let half = child.page_size() / 2;
    assert!(left.first < half, "page {} has nothing to lend", left.id);

    let steal = steal_count(half, left.first);
    let mut donor = left.drain();
    let mut entries = donor.split_off(donor.len() - steal);
    entries.extend(child.drain());

    left.fill(donor);
    child.fill(entries);
}

/// Move every entry of `left` into its right neighbour `right`.
///
/// `left` ends up empty. For leaves, `right` takes over the predecessor of
/// `left`; that predecessor's `next` must be updated by the caller.
pub fn merge_into_right<K, V>(left: &mut Page<K, V>, right: &mut Page<K, V>) {
    assert!(
        left.len() + right.len() <= right.page_size(),
        "merge of pages {} and {} overflows",
        left.id,
        right.id
    );

    let mut entries = left.drain();
    entries.extend(right.drain());
    right.fill(entries);

    if right.is_leaf() {
        right.set_previous(left.previous());
        left.set_next(RecordId::NONE);
        left.set_previous(RecordId::NONE);
    }
}

impl<K: Clone, V: Clone> Page<K, V> {
    /// Descend to the leaf that would hold `key` and position a cursor on
    /// the first entry `>= key`.
    pub(crate) fn find<'a>(
        self,
        pager: Pager<'a, K, V>,
        height: u32,
        key: &K,
    ) -> Result<Cursor<'a, K, V>> {
        let mut page = self;
        let mut height = height;
        loop {
            page.check_kind(height)?;
            let index = page.find_index(pager.comparator(), key);
            if height == 0 {
                return Ok(Cursor::new(pager, Some(page), index));
            }
            page = pager.load(page.child_at(index)?)?;
            height -= 1;
        }
    }

    /// Cursor before the smallest entry of the subtree.
    pub(crate) fn find_first<'a>(
        self,
        pager: Pager<'a, K, V>,
        height: u32,
    ) -> Result<Cursor<'a, K, V>> {
        let leaf = self.descend(pager, height, |page| page.first)?;
        let index = leaf.first;
        Ok(Cursor::new(pager, Some(leaf), index))
    }

    /// Cursor after the largest entry of the subtree.
    pub(crate) fn find_last<'a>(
        self,
        pager: Pager<'a, K, V>,
        height: u32,
    ) -> Result<Cursor<'a, K, V>> {
        let leaf = self.descend(pager, height, |page| page.page_size() - 1)?;
        let index = leaf.page_size();
        Ok(Cursor::new(pager, Some(leaf), index))
    }

    fn descend(
        self,
        pager: Pager<'_, K, V>,
        height: u32,
        slot: impl Fn(&Self) -> usize,
    ) -> Result<Self> {
        let mut page = self;
        for level in (1..=height).rev() {
            page.check_kind(level)?;
            page = pager.load(page.child_at(slot(&page))?)?;
        }
        page.check_kind(0)?;
        Ok(page)
    }

    /// Insert `key` into the subtree rooted at this page.
    ///
    /// An existing key keeps its value unless `replace` is set; either way
    /// the previous value is returned as `Existing`.
    pub(crate) fn insert(
        &mut self,
        pager: Pager<'_, K, V>,
        height: u32,
        key: K,
        value: V,
        replace: bool,
    ) -> Result<InsertOutcome<K, V>> {
        self.check_kind(height)?;
        let index = self.find_index(pager.comparator(), &key);

        let (key, payload) = if height == 0 {
            if compare_slot(pager.comparator(), self.key_at(index), &key) == Ordering::Equal {
                let existing = match &mut self.kind {
                    PageKind::Leaf { values, .. } if replace => values[index].replace(value),
                    PageKind::Leaf { values, .. } => values[index].clone(),
                    PageKind::Internal { .. } => None,
                };
                let existing = existing.ok_or_else(|| {
                    Error::Corrupted(format!("page {} slot {} has no value", self.id, index))
                })?;
                if replace {
                    pager.save(self)?;
                }
                return Ok(InsertOutcome::Existing(existing));
            }
            (Some(key), Payload::Value(Some(value)))
        } else {
            let mut child = pager.load(self.child_at(index)?)?;
            match child.insert(pager, height - 1, key, value, replace)? {
                InsertOutcome::Overflow(sibling) => {
                    self.keys[index] = child.largest_key().cloned();
                    (sibling.largest_key().cloned(), Payload::Child(sibling.id))
                }
                outcome => return Ok(outcome),
            }
        };

        if !self.is_full() {
            self.insert_at(index, key, payload);
            pager.save(self)?;
            return Ok(InsertOutcome::Done);
        }

        let mut sibling = self.empty_like();
        pager.create(&mut sibling)?;
        split_into(self, &mut sibling, index, key, payload);

        if sibling.previous().is_valid() {
            let mut predecessor = pager.load(sibling.previous())?;
            predecessor.set_next(sibling.id);
            pager.save(&predecessor)?;
        }
        pager.save(self)?;
        pager.save(&sibling)?;

        debug!(page = %self.id, sibling = %sibling.id, height, "split page");
        Ok(InsertOutcome::Overflow(sibling))
    }

    /// Remove `key` from the subtree rooted at this page.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if the key is absent; nothing is written then.
    pub(crate) fn remove(
        &mut self,
        pager: Pager<'_, K, V>,
        height: u32,
        key: &K,
    ) -> Result<RemoveOutcome<V>> {
        self.check_kind(height)?;
        let half = self.page_size() / 2;
        let index = self.find_index(pager.comparator(), key);

        let value = if height == 0 {
            if compare_slot(pager.comparator(), self.key_at(index), key) != Ordering::Equal {
                return Err(Error::KeyNotFound);
            }
            let (_, payload) = self.remove_at(index);
            pager.save(self)?;
            match payload {
                Payload::Value(Some(value)) => value,
                _ => {
                    return Err(Error::Corrupted(format!(
                        "page {} slot {} has no value",
                        self.id, index
                    )))
                }
            }
        } else {
            let mut child = pager.load(self.child_at(index)?)?;
            let outcome = child.remove(pager, height - 1, key)?;

            let separator_changed = compare_slots(
                pager.comparator(),
                self.keys[index].as_ref(),
                child.largest_key(),
            ) != Ordering::Equal;
            if separator_changed {
                self.keys[index] = child.largest_key().cloned();
            }

            match outcome {
                RemoveOutcome::Done(value) => {
                    if separator_changed {
                        pager.save(self)?;
                    }
                    value
                }
                RemoveOutcome::Underflow(value) => {
                    self.rebalance(pager, index, child)?;
                    value
                }
            }
        };

        if self.first > half {
            Ok(RemoveOutcome::Underflow(value))
        } else {
            Ok(RemoveOutcome::Done(value))
        }
    }

    /// Restore the fill of the underflowing child at `index`.
    fn rebalance(
        &mut self,
        pager: Pager<'_, K, V>,
        index: usize,
        mut child: Page<K, V>,
    ) -> Result<()> {
        let half = self.page_size() / 2;
        assert_eq!(
            child.first,
            half + 1,
            "page {} underflowed by more than one slot",
            child.id
        );

        let mut right = if index + 1 < self.page_size() {
            Some(pager.load(self.child_at(index + 1)?)?)
        } else {
            None
        };
        if let Some(right) = right.as_mut().filter(|page| page.first < half) {
            borrow_from_right(&mut child, right);
            self.keys[index] = child.largest_key().cloned();

            pager.save(self)?;
            pager.save(right)?;
            pager.save(&child)?;
            debug!(page = %child.id, from = %right.id, "borrowed from right sibling");
            return Ok(());
        }

        let mut left = if index > self.first {
            Some(pager.load(self.child_at(index - 1)?)?)
        } else {
            None
        };
        if let Some(left) = left.as_mut().filter(|page| page.first < half) {
            borrow_from_left(left, &mut child);
            self.keys[index - 1] = left.largest_key().cloned();

            pager.save(self)?;
            pager.save(left)?;
            pager.save(&child)?;
            debug!(page = %child.id, from = %left.id, "borrowed from left sibling");
            return Ok(());
        }

        match (right, left) {
            (Some(mut right), _) => self.merge_children(pager, index, child, &mut right),
            (None, Some(left)) => self.merge_children(pager, index - 1, left, &mut child),
            (None, None) => panic!("page {} has an underflowing only child", self.id),
        }
    }

    /// Merge the child at `left_index` into its right neighbour and drop it.
    fn merge_children(
        &mut self,
        pager: Pager<'_, K, V>,
        left_index: usize,
        mut left: Page<K, V>,
        right: &mut Page<K, V>,
    ) -> Result<()> {
        let half = self.page_size() / 2;
        let sibling_first = if left.first == half + 1 { right.first } else { left.first };
        assert_eq!(sibling_first, half, "merge with a sibling that has slack");

        let predecessor = left.previous();
        merge_into_right(&mut left, right);
        self.remove_at(left_index);

        if predecessor.is_valid() {
            let mut page = pager.load(predecessor)?;
            page.set_next(right.id);
            pager.save(&page)?;
        }
        pager.save(right)?;
        pager.save(self)?;
        pager.delete(left.id)?;

        debug!(page = %left.id, into = %right.id, "merged page");
        Ok(())
    }
}

/// Page I/O against a store, using a tree's codecs and page size.
pub(crate) struct Pager<'a, K, V> {
    store: &'a dyn RecordStore,
    options: &'a TreeOptions<K, V>,
}

impl<K, V> Clone for Pager<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Pager<'_, K, V> {}

impl<'a, K, V> Pager<'a, K, V> {
    pub(crate) fn new(store: &'a dyn RecordStore, options: &'a TreeOptions<K, V>) -> Self {
        Self { store, options }
    }

    #[inline]
    pub(crate) fn page_size(&self) -> usize {
        self.options.config().page_size()
    }

    #[inline]
    pub(crate) fn comparator(&self) -> &'a dyn Comparator<K> {
        self.options.comparator()
    }

    pub(crate) fn load(&self, id: RecordId) -> Result<Page<K, V>> {
        let bytes = self.store.fetch(id)?;
        Page::decode(
            id,
            &bytes,
            self.page_size(),
            self.options.key_codec(),
            self.options.value_codec(),
        )
    }

    pub(crate) fn save(&self, page: &Page<K, V>) -> Result<()> {
        let bytes = page.encode(self.options.key_codec(), self.options.value_codec())?;
        self.store.update(page.id, &bytes)
    }

    /// Insert `page` into the store and give it its id.
    pub(crate) fn create(&self, page: &mut Page<K, V>) -> Result<()> {
        let bytes = page.encode(self.options.key_codec(), self.options.value_codec())?;
        page.id = self.store.insert(&bytes)?;
        Ok(())
    }

    pub(crate) fn delete(&self, id: RecordId) -> Result<()> {
        self.store.delete(id)
    }
}
