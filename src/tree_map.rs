use core::borrow::Borrow;
use core::fmt;
use core::ops::Index;

use crate::raw::{Dir, RawTree, Seek, by_key};
use crate::{AllocationMode, TreeError};

mod cursor;
mod iter;

pub use cursor::{FastCursor, RobustCursor};
pub use iter::{Iter, Keys, Values};

type RawMap<K, V> = RawTree<K, V, i32, 0>;

/// An ordered map based on a threaded [AVL tree].
///
/// Keys must implement [`Ord`]; entries are kept in key order and every
/// lookup, insertion and removal takes O(log n). Unused child links are
/// threads to the in-order neighbours, so iteration needs no stack.
///
/// Operations come in two flavours. The `try_` form reports an expected
/// miss through its return value (`bool` or `Option`); the plain form turns
/// the same miss into a [`TreeError`].
///
/// # Examples
///
/// ```
/// use avl_offset_tree::{AvlTreeMap, TreeError};
///
/// let mut scores = AvlTreeMap::new();
/// scores.add("carol", 71).unwrap();
/// scores.add("alice", 93).unwrap();
/// scores.add("bob", 85).unwrap();
///
/// assert_eq!(scores.add("bob", 12), Err(TreeError::AlreadyPresent));
/// assert_eq!(scores.get("alice"), Ok(&93));
///
/// let names: Vec<_> = scores.keys().copied().collect();
/// assert_eq!(names, ["alice", "bob", "carol"]);
/// ```
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
#[derive(Clone)]
pub struct AvlTreeMap<K, V> {
    raw: RawMap<K, V>,
}

impl<K, V> AvlTreeMap<K, V> {
    /// Makes a new, empty `AvlTreeMap` with the default allocation policy.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlTreeMap;
    ///
    /// let mut map = AvlTreeMap::new();
    /// map.add(1, "a").unwrap();
    /// assert_eq!(map.len(), 1);
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: RawTree::new() }
    }

    /// Makes a new, empty map with room for `capacity` entries under `mode`.
    ///
    /// With [`AllocationMode::PreallocatedFixed`] the map can never hold more
    /// than `capacity` entries.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] if `capacity` exceeds the handle space.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::{AllocationMode, AvlTreeMap};
    ///
    /// let map: AvlTreeMap<u8, u8> = AvlTreeMap::with_capacity(16, AllocationMode::DynamicRetainFreelist).unwrap();
    /// assert_eq!(map.free_count(), 16);
    /// ```
    pub fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            raw: RawTree::with_capacity(capacity, mode)?,
        })
    }

    /// Returns the number of entries in the map.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Removes every entry. Freed nodes are kept or dropped according to the
    /// allocation policy.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Allocation policy chosen at construction.
    #[must_use]
    pub const fn allocation_mode(&self) -> AllocationMode {
        self.raw.mode()
    }

    /// Number of node slots currently allocated, in use or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Number of allocated node slots waiting on the freelist.
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.raw.free_count()
    }

    /// Grows the freelist until it holds at least `count` nodes.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] for a fixed pool that cannot supply
    /// `count` free nodes.
    pub fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        self.raw.ensure_free(count)
    }

    /// Returns the entry with the smallest key.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlTreeMap;
    ///
    /// let mut map = AvlTreeMap::new();
    /// assert_eq!(map.least(), None);
    /// map.add(2, "b").unwrap();
    /// map.add(1, "a").unwrap();
    /// assert_eq!(map.least(), Some((&1, &"a")));
    /// ```
    #[must_use]
    pub fn least(&self) -> Option<(&K, &V)> {
        self.raw.edge(Dir::Left).map(|at| self.raw.entry(at.handle))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn greatest(&self) -> Option<(&K, &V)> {
        self.raw.edge(Dir::Right).map(|at| self.raw.entry(at.handle))
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlTreeMap;
    ///
    /// let mut map = AvlTreeMap::new();
    /// map.add(3, "c").unwrap();
    /// map.add(1, "a").unwrap();
    /// map.add(2, "b").unwrap();
    ///
    /// let mut iter = map.iter();
    /// assert_eq!(iter.next(), Some((&1, &"a")));
    /// assert_eq!(iter.next_back(), Some((&3, &"c")));
    /// assert_eq!(iter.next(), Some((&2, &"b")));
    /// assert_eq!(iter.next(), None);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.raw)
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Starts a cursor that fails once the map is modified.
    ///
    /// The cursor holds no borrow; pass the map to each
    /// [`FastCursor::next`] call.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::{AvlTreeMap, TreeError};
    ///
    /// let mut map = AvlTreeMap::new();
    /// map.add(1, "a").unwrap();
    /// map.add(2, "b").unwrap();
    ///
    /// let mut cursor = map.fast_cursor(true);
    /// assert_eq!(cursor.next(&map), Ok(Some((&1, &"a"))));
    /// map.add(3, "c").unwrap();
    /// assert_eq!(cursor.next(&map), Err(TreeError::ConcurrentModification));
    /// ```
    #[must_use]
    pub fn fast_cursor(&self, forward: bool) -> FastCursor {
        FastCursor::new(&self.raw, forward)
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.seek(by_key(key), Seek::Exact).is_some()
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn try_get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let at = self.raw.seek(by_key(key), Seek::Exact)?;
        Some(self.raw.entry(at.handle).1)
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn get<Q>(&self, key: &Q) -> Result<&V, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.try_get(key).ok_or(TreeError::NotFound)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    pub fn try_get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let at = self.raw.seek(by_key(key), Seek::Exact)?;
        Some(self.raw.entry_mut(at.handle).1)
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.try_get_mut(key).ok_or(TreeError::NotFound)
    }

    /// Adds `key` if it is absent. Returns `Ok(false)` and leaves the map
    /// untouched when the key is already present.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] when no node can be allocated.
    pub fn try_add(&mut self, key: K, value: V) -> Result<bool, TreeError> {
        let descent = self.raw.descend(by_key(&key));
        if descent.found.is_some() {
            return Ok(false);
        }
        self.raw.insert(descent, key, value, [])?;
        Ok(true)
    }

    /// Adds `key`, which must be absent.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyPresent`] if the key is present, or
    /// [`TreeError::OutOfCapacity`] when no node can be allocated.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn add(&mut self, key: K, value: V) -> Result<(), TreeError> {
        if self.try_add(key, value)? { Ok(()) } else { Err(TreeError::AlreadyPresent) }
    }

    /// Adds `key` or replaces the value of an existing entry, returning the
    /// value it displaced.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] when a new node cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlTreeMap;
    ///
    /// let mut map = AvlTreeMap::new();
    /// assert_eq!(map.insert(37, "a"), Ok(None));
    /// assert_eq!(map.insert(37, "b"), Ok(Some("a")));
    /// assert_eq!(map[&37], "b");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TreeError> {
        let descent = self.raw.descend(by_key(&key));
        if let Some(at) = descent.found {
            return Ok(Some(core::mem::replace(self.raw.entry_mut(at.handle).1, value)));
        }
        self.raw.insert(descent, key, value, [])?;
        Ok(None)
    }

    /// Replaces the value of an existing entry. Returns `false` when the key
    /// is absent.
    pub fn try_set<Q>(&mut self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.try_get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Replaces the value of an existing entry.
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

    /// Removes `key`, returning its value if it was present.
    pub fn try_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.try_remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`, returning the stored key and value if it was present.
    pub fn try_remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let descent = self.raw.descend(by_key(key));
        self.raw.remove(descent)
    }

    /// Removes `key` and returns its value.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, TreeError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.try_remove(key).ok_or(TreeError::NotFound)
    }

    /// Returns the entry with the largest key strictly less than `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlTreeMap;
    ///
    /// let mut map = AvlTreeMap::new();
    /// for key in [10, 20, 30] {
    ///     map.add(key, ()).unwrap();
    /// }
    /// assert_eq!(map.nearest_less(&20).map(|(k, _)| *k), Some(10));
    /// assert_eq!(map.nearest_less_or_equal(&20).map(|(k, _)| *k), Some(20));
    /// assert_eq!(map.nearest_greater(&30), None);
    /// assert_eq!(map.nearest_greater_or_equal(&25).map(|(k, _)| *k), Some(30));
    /// ```
    pub fn nearest_less<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::Less)
    }

    /// Returns the entry with the largest key less than or equal to `key`.
    pub fn nearest_less_or_equal<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::LessOrEqual)
    }

    /// Returns the entry with the smallest key strictly greater than `key`.
    pub fn nearest_greater<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::Greater)
    }

    /// Returns the entry with the smallest key greater than or equal to `key`.
    pub fn nearest_greater_or_equal<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nearest(key, Seek::GreaterOrEqual)
    }

    fn nearest<Q>(&self, key: &Q, mode: Seek) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.seek(by_key(key), mode).map(|at| self.raw.entry(at.handle))
    }

    /// Starts a cursor that survives modification of the map by resuming
    /// after the last key it returned.
    ///
    /// With `start_at`, the first entry returned is the nearest one at or
    /// beyond that key in the walk direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::AvlTreeMap;
    ///
    /// let mut map = AvlTreeMap::new();
    /// map.add(1, "a").unwrap();
    /// map.add(3, "c").unwrap();
    ///
    /// let mut cursor = map.robust_cursor(true, None);
    /// assert_eq!(cursor.next(&map), Some((&1, &"a")));
    /// map.add(2, "b").unwrap();
    /// map.remove(&3).unwrap();
    /// assert_eq!(cursor.next(&map), Some((&2, &"b")));
    /// assert_eq!(cursor.next(&map), None);
    /// ```
    #[must_use]
    pub fn robust_cursor(&self, forward: bool, start_at: Option<K>) -> RobustCursor<K> {
        RobustCursor::new(start_at, forward)
    }
}

impl<K, V> Default for AvlTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for AvlTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for AvlTreeMap<K, V> {}

impl<K, Q, V> Index<&Q> for AvlTreeMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Returns a reference to the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.try_get(key).expect("no entry found for key")
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Add(u8, u16),
        Insert(u8, u16),
        Set(u8, u16),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Add(k, v)),
            (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
            (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Set(k, v)),
            any::<u8>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_btree_map(ops in proptest::collection::vec(op(), 0..200)) {
            let mut map = AvlTreeMap::new();
            let mut model = BTreeMap::new();
            for op in ops {
                match op {
                    Op::Add(k, v) => {
                        let expected = !model.contains_key(&k);
                        if expected {
                            model.insert(k, v);
                        }
                        prop_assert_eq!(map.try_add(k, v), Ok(expected));
                    }
                    Op::Insert(k, v) => prop_assert_eq!(map.insert(k, v), Ok(model.insert(k, v))),
                    Op::Set(k, v) => {
                        let expected = model.get_mut(&k).map(|slot| *slot = v).is_some();
                        prop_assert_eq!(map.try_set(&k, v), expected);
                    }
                    Op::Remove(k) => prop_assert_eq!(map.try_remove(&k), model.remove(&k)),
                }
                map.raw.validate_invariants();
            }
            prop_assert!(map.iter().eq(model.iter()));
            prop_assert!(map.iter().rev().eq(model.iter().rev()));
            prop_assert_eq!(map.least(), model.first_key_value());
            prop_assert_eq!(map.greatest(), model.last_key_value());
        }

        #[test]
        fn nearest_matches_range_queries(keys in proptest::collection::btree_set(0u8..100, 0..40), probe in 0u8..100) {
            let mut map = AvlTreeMap::new();
            for &key in &keys {
                map.add(key, ()).unwrap();
            }
            let key_of = |entry: Option<(&u8, &())>| entry.map(|(k, ())| *k);
            prop_assert_eq!(key_of(map.nearest_less(&probe)), keys.range(..probe).next_back().copied());
            prop_assert_eq!(key_of(map.nearest_less_or_equal(&probe)), keys.range(..=probe).next_back().copied());
            prop_assert_eq!(key_of(map.nearest_greater(&probe)), keys.range(probe + 1..).next().copied());
            prop_assert_eq!(key_of(map.nearest_greater_or_equal(&probe)), keys.range(probe..).next().copied());
        }
    }

    #[test]
    fn strict_forms_report_misses() {
        let mut map = AvlTreeMap::new();
        assert_eq!(map.get(&1), Err(TreeError::NotFound));
        assert_eq!(map.remove(&1), Err(TreeError::NotFound));
        assert_eq!(map.set(&1, 'x'), Err(TreeError::NotFound));
        map.add(1, 'a').unwrap();
        assert_eq!(map.add(1, 'b'), Err(TreeError::AlreadyPresent));
        assert_eq!(map.get(&1), Ok(&'a'));
    }

    #[test]
    fn borrowed_lookups() {
        let mut map: AvlTreeMap<alloc::string::String, usize> = AvlTreeMap::new();
        map.add("pear".into(), 4).unwrap();
        map.add("apple".into(), 5).unwrap();
        assert!(map.contains_key("pear"));
        assert_eq!(map.try_remove("apple"), Some(5));
        let keys: Vec<_> = map.keys().map(alloc::string::String::as_str).collect();
        assert_eq!(keys, ["pear"]);
    }
}
