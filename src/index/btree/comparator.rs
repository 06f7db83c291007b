//! Key ordering.
//!
//! Pages never compare keys directly: they go through a [`Comparator`], and
//! treat an absent key (`None`, the trailing slot of a rightmost page) as
//! greater than every real key.

use std::cmp::Ordering;

/// A total order over keys.
///
/// Any `Fn(&K, &K) -> Ordering` closure is a comparator.
///
/// # Example
/// ```
/// use pagetree::{Comparator, NaturalOrder, Reversed};
/// use std::cmp::Ordering;
///
/// assert_eq!(NaturalOrder.compare(&1, &2), Ordering::Less);
/// assert_eq!(Reversed(NaturalOrder).compare(&1, &2), Ordering::Greater);
///
/// let by_len = |a: &String, b: &String| a.len().cmp(&b.len());
/// assert_eq!(by_len.compare(&"aa".to_string(), &"b".to_string()), Ordering::Greater);
/// ```
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their `Ord` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Inverts another comparator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reversed<C>(pub C);

impl<K: ?Sized, C: Comparator<K>> Comparator<K> for Reversed<C> {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.0.compare(b, a)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Compare a slot key against a real key, `None` being +∞.
#[inline]
pub(crate) fn compare_slot<K: ?Sized>(
    comparator: &dyn Comparator<K>,
    slot: Option<&K>,
    key: &K,
) -> Ordering {
    match slot {
        None => Ordering::Greater,
        Some(slot) => comparator.compare(slot, key),
    }
}

/// Compare two slot keys, `None` being +∞ and equal only to itself.
#[inline]
pub(crate) fn compare_slots<K: ?Sized>(
    comparator: &dyn Comparator<K>,
    a: Option<&K>,
    b: Option<&K>,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => comparator.compare(a, b),
    }
}
