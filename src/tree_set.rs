use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use crate::tree_map::{self, AvlTreeMap};
use crate::{AllocationMode, TreeError};

/// An ordered set based on a threaded AVL tree.
///
/// See [`AvlTreeMap`]'s documentation for the allocation policies and the
/// `try_` / strict calling convention shared by every collection.
///
/// # Examples
///
/// ```
/// use avl_offset_tree::AvlTreeSet;
///
/// let mut books = AvlTreeSet::new();
/// books.add("A Dance With Dragons").unwrap();
/// books.add("To Kill a Mockingbird").unwrap();
/// books.add("The Odyssey").unwrap();
///
/// assert!(!books.contains("The Winds of Winter"));
/// books.remove("The Odyssey").unwrap();
///
/// let titles: Vec<_> = books.iter().copied().collect();
/// assert_eq!(titles, ["A Dance With Dragons", "To Kill a Mockingbird"]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AvlTreeSet<T> {
    map: AvlTreeMap<T, ()>,
}

impl<T> AvlTreeSet<T> {
    /// Makes a new, empty `AvlTreeSet`.
    #[must_use]
    pub const fn new() -> Self {
        Self { map: AvlTreeMap::new() }
    }

    /// Makes a new, empty set with room for `capacity` items under `mode`.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] if `capacity` exceeds the handle space.
    pub fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            map: AvlTreeMap::with_capacity(capacity, mode)?,
        })
    }

    /// Returns the number of items in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set contains no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[must_use]
    pub const fn allocation_mode(&self) -> AllocationMode {
        self.map.allocation_mode()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.map.free_count()
    }

    /// Grows the freelist until it holds at least `count` nodes.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] for a fixed pool that cannot supply them.
    pub fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        self.map.ensure_free(count)
    }

    /// Returns the smallest item.
    #[must_use]
    pub fn least(&self) -> Option<&T> {
        self.map.least().map(|(item, ())| item)
    }

    /// Returns the largest item.
    #[must_use]
    pub fn greatest(&self) -> Option<&T> {
        self.map.greatest().map(|(item, ())| item)
    }

    /// Gets an iterator that visits the items in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { inner: self.map.keys() }
    }

    /// Starts a cursor that fails once the set is modified.
    #[must_use]
    pub fn fast_cursor(&self, forward: bool) -> FastCursor {
        FastCursor {
            inner: self.map.fast_cursor(forward),
        }
    }
}

impl<T: Ord> AvlTreeSet<T> {
    /// Returns `true` if the set contains `item`.
    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.contains_key(item)
    }

    /// Adds `item` if absent. Returns `Ok(false)` when it was already present.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] when no node can be allocated.
    pub fn try_add(&mut self, item: T) -> Result<bool, TreeError> {
        self.map.try_add(item, ())
    }

    /// Adds `item`, which must be absent.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyPresent`] if the item is present, or
    /// [`TreeError::OutOfCapacity`] when no node can be allocated.
    pub fn add(&mut self, item: T) -> Result<(), TreeError> {
        self.map.add(item, ())
    }

    /// Removes `item`. Returns whether it was present.
    pub fn try_remove<Q>(&mut self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.try_remove(item).is_some()
    }

    /// Removes `item`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the item is absent.
    pub fn remove<Q>(&mut self, item: &Q) -> Result<(), TreeError>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.remove(item)
    }

    /// Removes and returns the stored item equal to `item`, if any.
    pub fn take<Q>(&mut self, item: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.try_remove_entry(item).map(|(item, ())| item)
    }

    /// Returns the largest item strictly less than `item`.
    pub fn nearest_less<Q>(&self, item: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.nearest_less(item).map(|(item, ())| item)
    }

    /// Returns the largest item less than or equal to `item`.
    pub fn nearest_less_or_equal<Q>(&self, item: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.nearest_less_or_equal(item).map(|(item, ())| item)
    }

    /// Returns the smallest item strictly greater than `item`.
    pub fn nearest_greater<Q>(&self, item: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.nearest_greater(item).map(|(item, ())| item)
    }

    /// Returns the smallest item greater than or equal to `item`.
    pub fn nearest_greater_or_equal<Q>(&self, item: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.nearest_greater_or_equal(item).map(|(item, ())| item)
    }

    /// Starts a cursor that tolerates modification of the set, optionally
    /// from the nearest item at or beyond `start_at`.
    #[must_use]
    pub fn robust_cursor(&self, forward: bool, start_at: Option<T>) -> RobustCursor<T> {
        RobustCursor {
            inner: self.map.robust_cursor(forward, start_at),
        }
    }
}

impl<T> Default for AvlTreeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for AvlTreeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a AvlTreeSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// An iterator over the items of an [`AvlTreeSet`], in ascending order.
pub struct Iter<'a, T> {
    inner: tree_map::Keys<'a, T, ()>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Cursor over an [`AvlTreeSet`] that fails once the set is modified.
#[derive(Clone, Debug)]
pub struct FastCursor {
    inner: tree_map::FastCursor,
}

impl FastCursor {
    /// Returns the next item, or `None` once the walk is complete.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConcurrentModification`] if `set` changed since the
    /// cursor was created.
    pub fn next<'a, T>(&mut self, set: &'a AvlTreeSet<T>) -> Result<Option<&'a T>, TreeError> {
        Ok(self.inner.next(&set.map)?.map(|(item, ())| item))
    }
}

/// Cursor over an [`AvlTreeSet`] that resumes after the last item returned.
#[derive(Clone, Debug)]
pub struct RobustCursor<T> {
    inner: tree_map::RobustCursor<T>,
}

impl<T: Ord + Clone> RobustCursor<T> {
    /// Returns the item following the last one returned.
    pub fn next<'a>(&mut self, set: &'a AvlTreeSet<T>) -> Option<&'a T> {
        self.inner.next(&set.map).map(|(item, ())| item)
    }
}
