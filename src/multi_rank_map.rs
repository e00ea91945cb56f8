use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use crate::raw::{Dir, Located, RawIter, RawTree, Seek, by_key, by_start};
use crate::{AllocationMode, Position, TreeError};

mod cursor;

pub use cursor::{FastCursor, RobustCursor};

type RawRankTree<K, V, P> = RawTree<K, V, P, 1>;

/// A key together with the run of ranks it occupies.
///
/// `rank` is the first rank of the run, i.e. the sum of the counts of every
/// smaller key; the key covers ranks `rank..rank + count`.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct RankEntry<'a, K, V, P = i32> {
    pub key: &'a K,
    pub value: &'a V,
    pub rank: P,
    pub count: P,
}

impl<K, V, P: Copy> Clone for RankEntry<'_, K, V, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, P: Copy> Copy for RankEntry<'_, K, V, P> {}

impl<'a, K, V, P: Position> RankEntry<'a, K, V, P> {
    fn at(raw: &'a RawRankTree<K, V, P>, at: Located<P, 1>) -> Self {
        let (key, value) = raw.entry(at.handle);
        Self {
            key,
            value,
            rank: at.start[0],
            count: at.length()[0],
        }
    }
}

/// An ordered map in which every key occupies a run of `count` consecutive
/// ranks, as if it were repeated `count` times in a sorted array.
///
/// Ranks are not stored: each node keeps its rank relative to its parent, so
/// adding, removing or recounting a key renumbers every later key in
/// O(log n).
///
/// # Examples
///
/// ```
/// use avl_offset_tree::AvlMultiRankMap;
///
/// let mut stock = AvlMultiRankMap::new();
/// stock.add("apple", 1.25, 3).unwrap();
/// stock.add("cherry", 4.0, 2).unwrap();
/// stock.add("banana", 0.5, 5).unwrap();
///
/// let cherry = stock.get("cherry").unwrap();
/// assert_eq!((cherry.rank, cherry.count), (8, 2));
/// assert_eq!(stock.get_key_by_rank(4).unwrap().key, &"banana");
/// assert_eq!(stock.rank_count(), 10);
///
/// // Dropping the count to zero removes the key.
/// stock.adjust_count("banana", -5).unwrap();
/// assert_eq!(stock.get("cherry").unwrap().rank, 3);
/// ```
#[derive(Clone)]
pub struct AvlMultiRankMap<K, V, P = i32> {
    raw: RawRankTree<K, V, P>,
}

impl<K, V> AvlMultiRankMap<K, V> {
    /// Makes a new, empty map with 32-bit ranks. Other widths start from
    /// [`Default::default`] or [`with_capacity`](Self::with_capacity).
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: RawTree::new() }
    }
}

impl<K, V, P: Position> AvlMultiRankMap<K, V, P> {
    /// Makes a new, empty map with room for `capacity` keys under `mode`.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] if `capacity` exceeds the handle space.
    pub fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            raw: RawTree::with_capacity(capacity, mode)?,
        })
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Total number of ranks: the sum of every key's count.
    #[must_use]
    pub const fn rank_count(&self) -> P {
        self.raw.extent()[0]
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    #[must_use]
    pub const fn allocation_mode(&self) -> AllocationMode {
        self.raw.mode()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.raw.free_count()
    }

    /// Grows the freelist until it holds at least `count` nodes.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] for a fixed pool that cannot supply them.
    pub fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        self.raw.ensure_free(count)
    }

    /// Returns the key whose run of ranks contains `rank`.
    #[must_use]
    pub fn try_get_key_by_rank(&self, rank: P) -> Option<RankEntry<'_, K, V, P>> {
        if rank < P::ZERO || rank >= self.rank_count() {
            return None;
        }
        let at = self.raw.seek(by_start(rank, 0), Seek::LessOrEqual)?;
        Some(RankEntry::at(&self.raw, at))
    }

    /// Returns the key whose run of ranks contains `rank`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative rank, [`TreeError::NotFound`]
    /// for a rank at or beyond [`rank_count`](Self::rank_count).
    pub fn get_key_by_rank(&self, rank: P) -> Result<RankEntry<'_, K, V, P>, TreeError> {
        if rank < P::ZERO {
            return Err(TreeError::OutOfRange("rank must not be negative"));
        }
        self.try_get_key_by_rank(rank).ok_or(TreeError::NotFound)
    }

    /// Returns the smallest key.
    #[must_use]
    pub fn least(&self) -> Option<RankEntry<'_, K, V, P>> {
        self.raw.edge(Dir::Left).map(|at| RankEntry::at(&self.raw, at))
    }

    /// Returns the largest key.
    #[must_use]
    pub fn greatest(&self) -> Option<RankEntry<'_, K, V, P>> {
        self.raw.edge(Dir::Right).map(|at| RankEntry::at(&self.raw, at))
    }

    /// Gets a double-ended iterator over the keys in order, with their ranks.
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter {
            inner: RawIter::new(&self.raw),
        }
    }

    /// Starts a cursor that fails once the map is modified.
    #[must_use]
    pub fn fast_cursor(&self, forward: bool) -> FastCursor<P> {
        FastCursor::new(&self.raw, forward)
    }
}

impl<K: Ord, V, P: Position> AvlMultiRankMap<K, V, P> {
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.seek(by_key(key), Seek::Exact).is_some()
    }

    /// Adds `key` with a run of `count` ranks placed after every smaller key.
    /// Returns `Ok(false)` and leaves the map untouched if the key exists.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] if `count` is not positive,
    /// [`TreeError::Overflow`] if the rank count would overflow `P`, or
    /// [`TreeError::OutOfCapacity`] when no node can be allocated.
    pub fn try_add(&mut self, key: K, value: V, count: P) -> Result<bool, TreeError> {
        check_count(count)?;
        let descent = self.raw.descend(by_key(&key));
        if descent.found.is_some() {
            return Ok(false);
        }
        self.raw.insert(descent, key, value, [count])?;
        Ok(true)
    }

    /// Adds `key`, which must be absent.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyPresent`] if the key exists, otherwise as
    /// [`try_add`](Self::try_add).
    pub fn add(&mut self, key: K, value: V, count: P) -> Result<(), TreeError> {
        if self.try_add(key, value, count)? { Ok(()) } else { Err(TreeError::AlreadyPresent) }
    }

    /// Replaces the value and count of an existing key. Returns `Ok(false)`
    /// when the key is absent.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] if `count` is not positive, or
    /// [`TreeError::Overflow`] if the rank count would overflow `P`.
    pub fn try_set<Q>(&mut self, key: &Q, value: V, count: P) -> Result<bool, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        check_count(count)?;
        let Some(at) = self.raw.seek(by_key(key), Seek::Exact) else {
            return Ok(false);
        };
        self.raw.resize(&at, [count])?;
        *self.raw.entry_mut(at.handle).1 = value;
        Ok(true)
    }

    /// Replaces the value and count of an existing key.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent, otherwise as
    /// [`try_set`](Self::try_set).
    pub fn set<Q>(&mut self, key: &Q, value: V, count: P) -> Result<(), TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if self.try_set(key, value, count)? { Ok(()) } else { Err(TreeError::NotFound) }
    }

    /// Adds `delta` to the count of `key` and returns the new count.
    ///
    /// A count that reaches exactly zero removes the key. A positive `delta`
    /// on an absent key adds it with `V::default()`.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] for a negative `delta` on an absent key
    /// - [`TreeError::OutOfRange`] if the count would become negative
    /// - [`TreeError::Overflow`] if the count or the rank count would overflow
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlMultiRankMap;
    ///
    /// let mut votes: AvlMultiRankMap<&str, ()> = AvlMultiRankMap::new();
    /// assert_eq!(votes.adjust_count("yes", 3), Ok(3));
    /// assert_eq!(votes.adjust_count("yes", -1), Ok(2));
    /// assert_eq!(votes.adjust_count("yes", -2), Ok(0));
    /// assert!(votes.is_empty());
    /// ```
    pub fn adjust_count(&mut self, key: K, delta: P) -> Result<P, TreeError>
    where
        V: Default,
    {
        let descent = self.raw.descend(by_key(&key));
        let Some(at) = descent.found else {
            return match delta.cmp(&P::ZERO) {
                core::cmp::Ordering::Greater => {
                    self.raw.insert(descent, key, V::default(), [delta])?;
                    Ok(delta)
                }
                core::cmp::Ordering::Equal => Ok(P::ZERO),
                core::cmp::Ordering::Less => Err(TreeError::NotFound),
            };
        };

        let count = at.length()[0].checked_add(delta).ok_or(TreeError::Overflow)?;
        if count == P::ZERO {
            self.raw.remove(descent);
        } else if count < P::ZERO {
            return Err(TreeError::OutOfRange("count would become negative"));
        } else if count != at.length()[0] {
            self.raw.resize(&at, [count])?;
        }
        Ok(count)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn try_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let descent = self.raw.descend(by_key(key));
        self.raw.remove(descent).map(|(_, value)| value)
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
        self.try_remove(key).ok_or(TreeError::NotFound)
    }

    /// Returns `key` with its value, rank and count.
    pub fn try_get<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::Exact)
    }

    /// Returns `key` with its value, rank and count.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn get<Q>(&self, key: &Q) -> Result<RankEntry<'_, K, V, P>, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.try_get(key).ok_or(TreeError::NotFound)
    }

    pub fn try_get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let at = self.raw.seek(by_key(key), Seek::Exact)?;
        Some(self.raw.entry_mut(at.handle).1)
    }

    /// Returns the largest key strictly less than `key`.
    pub fn nearest_less<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::Less)
    }

    /// Returns the largest key less than or equal to `key`.
    pub fn nearest_less_or_equal<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::LessOrEqual)
    }

    /// Returns the smallest key strictly greater than `key`.
    pub fn nearest_greater<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::Greater)
    }

    /// Returns the smallest key greater than or equal to `key`.
    pub fn nearest_greater_or_equal<Q>(&self, key: &Q) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::GreaterOrEqual)
    }

    fn nearest<Q>(&self, key: &Q, mode: Seek) -> Option<RankEntry<'_, K, V, P>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let at = self.raw.seek(by_key(key), mode)?;
        Some(RankEntry::at(&self.raw, at))
    }

    /// Starts a cursor that tolerates modification, optionally from the
    /// nearest key at or beyond `start_at`.
    #[must_use]
    pub fn robust_cursor(&self, forward: bool, start_at: Option<K>) -> RobustCursor<K> {
        RobustCursor::new(start_at, forward)
    }
}

fn check_count<P: Position>(count: P) -> Result<(), TreeError> {
    if count > P::ZERO { Ok(()) } else { Err(TreeError::OutOfRange("count must be positive")) }
}

impl<K, V, P: Position> Default for AvlMultiRankMap<K, V, P> {
    fn default() -> Self {
        Self { raw: RawTree::new() }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, P: Position> fmt::Debug for AvlMultiRankMap<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, K, V, P: Position> IntoIterator for &'a AvlMultiRankMap<K, V, P> {
    type Item = RankEntry<'a, K, V, P>;
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Iter<'a, K, V, P> {
        self.iter()
    }
}

/// An iterator over the keys of an [`AvlMultiRankMap`] with their ranks.
pub struct Iter<'a, K, V, P> {
    inner: RawIter<'a, K, V, P, 1>,
}

impl<K, V, P: Position> Clone for Iter<'_, K, V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V, P: Position> Iterator for Iter<'a, K, V, P> {
    type Item = RankEntry<'a, K, V, P>;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.inner.next()?;
        Some(RankEntry::at(self.inner.tree(), at))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: Position> DoubleEndedIterator for Iter<'_, K, V, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let at = self.inner.next_back()?;
        Some(RankEntry::at(self.inner.tree(), at))
    }
}

impl<K, V, P: Position> ExactSizeIterator for Iter<'_, K, V, P> {}

impl<K, V, P: Position> FusedIterator for Iter<'_, K, V, P> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    // Ranks recomputed from scratch out of a sorted model.
    fn model_ranks(model: &BTreeMap<u8, i32>) -> Vec<(u8, i32, i32)> {
        let mut rank = 0;
        model
            .iter()
            .map(|(&key, &count)| {
                let entry = (key, rank, count);
                rank += count;
                entry
            })
            .collect()
    }

    proptest! {
        #[test]
        fn ranks_follow_counts(ops in proptest::collection::vec((0u8..32, -4i32..6), 0..150)) {
            let mut map: AvlMultiRankMap<u8, ()> = AvlMultiRankMap::new();
            let mut model: BTreeMap<u8, i32> = BTreeMap::new();
            for (key, delta) in ops {
                let current = model.get(&key).copied();
                let result = map.adjust_count(key, delta);
                match current {
                    None if delta < 0 => prop_assert_eq!(result, Err(TreeError::NotFound)),
                    None if delta == 0 => prop_assert_eq!(result, Ok(0)),
                    None => {
                        prop_assert_eq!(result, Ok(delta));
                        model.insert(key, delta);
                    }
                    Some(count) if count + delta < 0 => {
                        prop_assert!(matches!(result, Err(TreeError::OutOfRange(_))));
                    }
                    Some(count) if count + delta == 0 => {
                        prop_assert_eq!(result, Ok(0));
                        model.remove(&key);
                    }
                    Some(count) => {
                        prop_assert_eq!(result, Ok(count + delta));
                        model.insert(key, count + delta);
                    }
                }
                map.raw.validate_invariants();
            }

            let expected = model_ranks(&model);
            let actual: Vec<_> = map.iter().map(|e| (*e.key, e.rank, e.count)).collect();
            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(map.rank_count(), model.values().sum::<i32>());

            for &(key, rank, count) in &expected {
                for r in rank..rank + count {
                    prop_assert_eq!(map.try_get_key_by_rank(r).map(|e| *e.key), Some(key));
                }
            }
        }
    }

    #[test]
    fn set_replaces_value_and_count() {
        let mut map = AvlMultiRankMap::new();
        map.add('a', 1, 2).unwrap();
        map.add('b', 2, 2).unwrap();
        assert_eq!(map.set(&'a', 10, 5), Ok(()));
        let b = map.get(&'b').unwrap();
        assert_eq!((b.rank, b.count), (5, 2));
        assert_eq!(map.get(&'a').map(|e| *e.value), Ok(10));
        assert_eq!(map.set(&'z', 0, 1), Err(TreeError::NotFound));
        assert!(matches!(map.try_set(&'a', 0, 0), Err(TreeError::OutOfRange(_))));
    }

    #[test]
    fn rank_lookups_outside_the_extent() {
        let mut map: AvlMultiRankMap<u8, (), i64> = AvlMultiRankMap::default();
        map.add(1, (), 3).unwrap();
        assert!(map.try_get_key_by_rank(3).is_none());
        assert_eq!(map.get_key_by_rank(3).map(|e| *e.key), Err(TreeError::NotFound));
        assert!(matches!(map.get_key_by_rank(-1), Err(TreeError::OutOfRange(_))));
        assert_eq!(map.get_key_by_rank(2).map(|e| *e.key), Ok(1));
    }

    #[test]
    fn rank_count_overflow_is_rejected() {
        let mut map = AvlMultiRankMap::new();
        map.add(1u8, (), i32::MAX).unwrap();
        assert_eq!(map.add(2, (), 1), Err(TreeError::Overflow));
        assert_eq!(map.adjust_count(1, 1), Err(TreeError::Overflow));
        assert_eq!(map.len(), 1);
        assert_eq!(map.rank_count(), i32::MAX);
    }
}
