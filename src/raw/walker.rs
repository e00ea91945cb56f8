use core::iter::FusedIterator;

use smallvec::SmallVec;

use super::handle::Handle;
use super::node::{Dir, Link};
use super::raw_tree::{Located, MAX_HEIGHT, RawTree, Seek};
use crate::TreeError;
use crate::position::{Position, add_axes};

/// In-order walk over an explicit stack of `(node, start)` pairs.
///
/// Holds no borrow of the tree; every step checks the tree's version and
/// fails once the tree has been modified since the walk began. Versions are
/// unique across trees, so a walker handed a different modified tree fails
/// the same way.
#[derive(Clone, Debug)]
pub(crate) struct Walker<P, const N: usize> {
    stack: SmallVec<[(Handle, [P; N]); MAX_HEIGHT]>,
    forward: bool,
    version: u64,
    // Start of the node yielded last by a reverse walk: the end of the next one.
    previous: [P; N],
}

impl<P: Position, const N: usize> Walker<P, N> {
    pub(crate) fn new<K, V>(tree: &RawTree<K, V, P, N>, forward: bool) -> Self {
        let mut walker = Self {
            stack: SmallVec::new(),
            forward,
            version: tree.version(),
            previous: tree.extent(),
        };
        if let Some(root) = tree.root() {
            walker.push_spine(tree, root, tree.node(root).offset);
        }
        walker
    }

    fn push_spine<K, V>(&mut self, tree: &RawTree<K, V, P, N>, mut handle: Handle, mut start: [P; N]) {
        let side = if self.forward { Dir::Left } else { Dir::Right };
        loop {
            self.stack.push((handle, start));
            match tree.node(handle).link(side) {
                Link::Child(child) => {
                    start = add_axes(start, tree.node(child).offset);
                    handle = child;
                }
                Link::Thread(_) => break,
            }
        }
    }

    pub(crate) fn next<K, V>(&mut self, tree: &RawTree<K, V, P, N>) -> Result<Option<Located<P, N>>, TreeError> {
        if tree.version() != self.version {
            return Err(TreeError::ConcurrentModification);
        }
        let Some((handle, start)) = self.stack.pop() else {
            return Ok(None);
        };

        let end = if self.forward {
            if let Link::Child(right) = tree.node(handle).right {
                self.push_spine(tree, right, add_axes(start, tree.node(right).offset));
            }
            // The top of the stack is now the successor.
            self.stack.last().map_or(tree.extent(), |&(_, next)| next)
        } else {
            if let Link::Child(left) = tree.node(handle).left {
                self.push_spine(tree, left, add_axes(start, tree.node(left).offset));
            }
            core::mem::replace(&mut self.previous, start)
        };
        Ok(Some(Located { handle, start, end }))
    }
}

/// Where a robust cursor picks up: at or beyond an optional anchor before
/// its first step, strictly beyond the last entry it returned afterwards.
#[derive(Clone, Debug)]
pub(crate) enum Resume<T> {
    From(Option<T>),
    After(T),
}

impl<T> Resume<T> {
    /// Anchor and seek mode for the next step, or `None` to start at the edge
    /// the walk begins from.
    pub(crate) fn target(&self, forward: bool) -> Option<(&T, Seek)> {
        match (self, forward) {
            (Resume::From(None), _) => None,
            (Resume::From(Some(anchor)), true) => Some((anchor, Seek::GreaterOrEqual)),
            (Resume::From(Some(anchor)), false) => Some((anchor, Seek::LessOrEqual)),
            (Resume::After(anchor), true) => Some((anchor, Seek::Greater)),
            (Resume::After(anchor), false) => Some((anchor, Seek::Less)),
        }
    }
}

/// Double-ended borrowing walk yielding located nodes in order.
pub(crate) struct RawIter<'a, K, V, P, const N: usize> {
    tree: &'a RawTree<K, V, P, N>,
    front: Walker<P, N>,
    back: Walker<P, N>,
    remaining: usize,
}

impl<'a, K, V, P: Position, const N: usize> RawIter<'a, K, V, P, N> {
    pub(crate) fn new(tree: &'a RawTree<K, V, P, N>) -> Self {
        Self {
            tree,
            front: Walker::new(tree, true),
            back: Walker::new(tree, false),
            remaining: tree.len(),
        }
    }

    pub(crate) const fn tree(&self) -> &'a RawTree<K, V, P, N> {
        self.tree
    }
}

impl<K, V, P: Position, const N: usize> Clone for RawIter<'_, K, V, P, N> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front.clone(),
            back: self.back.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K, V, P: Position, const N: usize> Iterator for RawIter<'_, K, V, P, N> {
    type Item = Located<P, N>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        // The shared borrow rules out modification, so the walk cannot fail.
        self.front.next(self.tree).ok().flatten()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P: Position, const N: usize> DoubleEndedIterator for RawIter<'_, K, V, P, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.back.next(self.tree).ok().flatten()
    }
}

impl<K, V, P: Position, const N: usize> ExactSizeIterator for RawIter<'_, K, V, P, N> {}

impl<K, V, P: Position, const N: usize> FusedIterator for RawIter<'_, K, V, P, N> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::cmp::Ordering;

    fn range_tree(lengths: &[i32]) -> RawTree<(), usize, i32, 1> {
        let mut tree = RawTree::new();
        for (value, &length) in lengths.iter().enumerate() {
            let end = tree.extent()[0];
            let descent = tree.descend(|(), start| if end <= start[0] { Ordering::Less } else { Ordering::Greater });
            tree.insert(descent, (), value, [length]).unwrap();
        }
        tree
    }

    #[test]
    fn walks_report_starts_and_ends() {
        let tree = range_tree(&[3, 5, 2, 7, 1]);
        let forward: Vec<_> = RawIter::new(&tree).map(|at| (at.start[0], at.end[0])).collect();
        assert_eq!(forward, [(0, 3), (3, 8), (8, 10), (10, 17), (17, 18)]);

        let backward: Vec<_> = RawIter::new(&tree).rev().map(|at| (at.start[0], at.end[0])).collect();
        assert_eq!(backward, [(17, 18), (10, 17), (8, 10), (3, 8), (0, 3)]);
    }

    #[test]
    fn front_and_back_meet() {
        let tree = range_tree(&[1, 1, 1, 1]);
        let mut iter = RawIter::new(&tree);
        assert_eq!(iter.next().map(|at| at.start), Some([0]));
        assert_eq!(iter.next_back().map(|at| at.start), Some([3]));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next().map(|at| at.start), Some([1]));
        assert_eq!(iter.next_back().map(|at| at.start), Some([2]));
        assert!(iter.next().is_none());
    }

    #[test]
    fn walker_detects_modification() {
        let mut tree = range_tree(&[2, 2]);
        let mut walker = Walker::new(&tree, true);
        assert!(walker.next(&tree).unwrap().is_some());

        let at = tree.seek(|(), start| 0.cmp(&start[0]), Seek::Exact).unwrap();
        tree.resize(&at, [4]).unwrap();
        assert_eq!(walker.next(&tree), Err(TreeError::ConcurrentModification));
    }

    #[test]
    fn walker_rejects_another_tree() {
        let a = range_tree(&[1, 2, 3]);
        let b = range_tree(&[4, 5, 6]);
        let mut walker = Walker::new(&a, true);
        assert_eq!(walker.next(&b), Err(TreeError::ConcurrentModification));
        assert_eq!(walker.next(&a).map(|at| at.map(|at| at.start)), Ok(Some([0])));
    }

    #[test]
    fn resume_targets_follow_direction() {
        assert_eq!(Resume::<i32>::From(None).target(true), None);
        assert_eq!(Resume::From(Some(4)).target(true), Some((&4, Seek::GreaterOrEqual)));
        assert_eq!(Resume::From(Some(4)).target(false), Some((&4, Seek::LessOrEqual)));
        assert_eq!(Resume::After(4).target(true), Some((&4, Seek::Greater)));
        assert_eq!(Resume::After(4).target(false), Some((&4, Seek::Less)));
    }
}
