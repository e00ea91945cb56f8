use core::borrow::Borrow;
use core::fmt;

use crate::multi_rank_map::{self, AvlMultiRankMap, RankEntry};
use crate::{AllocationMode, Position, TreeError};

/// An ordered map that also answers "what is the index of this key" and
/// "which key sits at this index" in O(log n).
///
/// Every key occupies exactly one rank, so ranks are the 0-based positions
/// of the keys in sorted order and [`rank_count`](Self::rank_count) equals
/// [`len`](Self::len).
///
/// # Examples
///
/// ```
/// use avl_offset_tree::AvlRankMap;
///
/// let mut map = AvlRankMap::new();
/// for key in [5, 3, 8, 1, 4, 7, 9] {
///     map.add(key, ()).unwrap();
/// }
/// assert_eq!(map.greatest().map(|e| *e.key), Some(9));
/// assert_eq!(map.rank_of(&8), Ok(5));
/// assert_eq!(map.get_key_by_rank(2).map(|e| *e.key), Ok(4));
/// assert_eq!(map.rank_count(), 7);
/// ```
#[derive(Clone)]
pub struct AvlRankMap<K, V, P = i32> {
    inner: AvlMultiRankMap<K, V, P>,
}

impl<K, V> AvlRankMap<K, V> {
    /// Makes a new, empty map with 32-bit ranks.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: AvlMultiRankMap::new(),
        }
    }
}

impl<K, V, P: Position> AvlRankMap<K, V, P> {
    /// Makes a new, empty map with room for `capacity` keys under `mode`.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] if `capacity` exceeds the handle space.
    pub fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            inner: AvlMultiRankMap::with_capacity(capacity, mode)?,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of ranks in use; always equal to [`len`](Self::len).
    #[must_use]
    pub const fn rank_count(&self) -> P {
        self.inner.rank_count()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    #[must_use]
    pub const fn allocation_mode(&self) -> AllocationMode {
        self.inner.allocation_mode()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.inner.free_count()
    }

    /// Grows the freelist until it holds at least `count` nodes.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] for a fixed pool that cannot supply them.
    pub fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        self.inner.ensure_free(count)
    }

    /// Returns the key at index `rank` in sorted order.
    #[must_use]
    pub fn try_get_key_by_rank(&self, rank: P) -> Option<RankEntry<'_, K, V, P>> {
        self.inner.try_get_key_by_rank(rank)
    }

    /// Returns the key at index `rank` in sorted order.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative rank, [`TreeError::NotFound`]
    /// for a rank at or beyond [`rank_count`](Self::rank_count).
    pub fn get_key_by_rank(&self, rank: P) -> Result<RankEntry<'_, K, V, P>, TreeError> {
        self.inner.get_key_by_rank(rank)
    }

    #[must_use]
    pub fn least(&self) -> Option<RankEntry<'_, K, V, P>> {
        self.inner.least()
    }

    #[must_use]
    pub fn greatest(&self) -> Option<RankEntry<'_, K, V, P>> {
        self.inner.greatest()
    }

    pub fn iter(&self) -> multi_rank_map::Iter<'_, K, V, P> {
        self.inner.iter()
    }

    /// Starts a cursor that fails once the map is modified.
    #[must_use]
    pub fn fast_cursor(&self, forward: bool) -> FastCursor<P> {
        FastCursor {
            inner: self.inner.fast_cursor(forward),
        }
    }
}

impl<K: Ord, V, P: Position> AvlRankMap<K, V, P> {
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.contains_key(key)
    }

    /// Adds `key` if absent, renumbering every larger key.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] once `P` cannot count another key, or
    /// [`TreeError::OutOfCapacity`] when no node can be allocated.
    pub fn try_add(&mut self, key: K, value: V) -> Result<bool, TreeError> {
        self.inner.try_add(key, value, P::ONE)
    }

    /// Adds `key`, which must be absent.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyPresent`] if the key exists, otherwise as
    /// [`try_add`](Self::try_add).
    pub fn add(&mut self, key: K, value: V) -> Result<(), TreeError> {
        self.inner.add(key, value, P::ONE)
    }

    /// Replaces the value of an existing key. Returns `false` when absent.
    pub fn try_set<Q>(&mut self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.inner.try_get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Replaces the value of an existing key.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn set<Q>(&mut self, key: &Q, value: V) -> Result<(), TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if self.try_set(key, value) { Ok(()) } else { Err(TreeError::NotFound) }
    }

    pub fn try_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.try_remove(key)
    }

    /// Removes `key` and returns its value.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.remove(key)
    }

    pub fn try_get<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.try_get(key)
    }

    /// Returns `key` with its value and rank.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn get<Q>(&self, key: &Q) -> Result<RankEntry<'_, K, V, P>, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.get(key)
    }

    pub fn try_get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.try_get_mut(key)
    }

    /// Index of `key` in sorted order, if present.
    pub fn try_rank_of<Q>(&self, key: &Q) -> Option<P>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.try_get(key).map(|entry| entry.rank)
    }

    /// Index of `key` in sorted order.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn rank_of<Q>(&self, key: &Q) -> Result<P, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.try_rank_of(key).ok_or(TreeError::NotFound)
    }

    pub fn nearest_less<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.nearest_less(key)
    }

    pub fn nearest_less_or_equal<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.nearest_less_or_equal(key)
    }

    pub fn nearest_greater<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.nearest_greater(key)
    }

    pub fn nearest_greater_or_equal<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.inner.nearest_greater_or_equal(key)
    }

    /// Starts a cursor that tolerates modification, optionally from the
    /// nearest key at or beyond `start_at`.
    #[must_use]
    pub fn robust_cursor(&self, forward: bool, start_at: Option<K>) -> RobustCursor<K> {
        RobustCursor {
            inner: self.inner.robust_cursor(forward, start_at),
        }
    }
}

impl<K, V, P: Position> Default for AvlRankMap<K, V, P> {
    fn default() -> Self {
        Self {
            inner: AvlMultiRankMap::default(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, P: Position> fmt::Debug for AvlRankMap<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter().map(|entry| (entry.key, entry.value))).finish()
    }
}

impl<'a, K, V, P: Position> IntoIterator for &'a AvlRankMap<K, V, P> {
    type Item = RankEntry<'a, K, V, P>;
    type IntoIter = multi_rank_map::Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over an [`AvlRankMap`] that fails once the map is modified.
#[derive(Clone, Debug)]
pub struct FastCursor<P> {
    inner: multi_rank_map::FastCursor<P>,
}

impl<P: Position> FastCursor<P> {
    /// Returns the next key with its rank.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConcurrentModification`] if `map` changed since the
    /// cursor was created.
    pub fn next<'a, K, V>(&mut self, map: &'a AvlRankMap<K, V, P>) -> Result<Option<RankEntry<'a, K, V, P>>, TreeError> {
        self.inner.next(&map.inner)
    }
}

/// Cursor over an [`AvlRankMap`] that resumes after the last key returned.
#[derive(Clone, Debug)]
pub struct RobustCursor<K> {
    inner: multi_rank_map::RobustCursor<K>,
}

impl<K: Ord + Clone> RobustCursor<K> {
    pub fn next<'a, V, P: Position>(&mut self, map: &'a AvlRankMap<K, V, P>) -> Option<RankEntry<'a, K, V, P>> {
        self.inner.next(&map.inner)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ranks_are_sorted_indices(keys in proptest::collection::vec(any::<u16>(), 0..120), removals in proptest::collection::vec(any::<u16>(), 0..60)) {
            let mut map: AvlRankMap<u16, (), i64> = AvlRankMap::default();
            let mut model = BTreeSet::new();
            for key in keys {
                prop_assert_eq!(map.try_add(key, ()), Ok(model.insert(key)));
            }
            for key in removals {
                prop_assert_eq!(map.try_remove(&key).is_some(), model.remove(&key));
            }
            prop_assert_eq!(map.rank_count(), i64::try_from(model.len()).unwrap());
            for (index, key) in model.iter().enumerate() {
                let index = i64::try_from(index).unwrap();
                prop_assert_eq!(map.rank_of(key), Ok(index));
                prop_assert_eq!(map.get_key_by_rank(index).map(|e| *e.key), Ok(*key));
            }
        }
    }

    #[test]
    fn set_keeps_rank() {
        let mut map = AvlRankMap::new();
        map.add("b", 2).unwrap();
        map.add("a", 1).unwrap();
        assert_eq!(map.set("b", 20), Ok(()));
        assert_eq!(map.get("b").map(|e| (e.rank, *e.value)), Ok((1, 20)));
        assert!(!map.try_set("c", 3));
    }
}
