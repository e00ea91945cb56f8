use core::borrow::Borrow;
use core::cmp::Ordering;
use core::sync::atomic::{self, AtomicU64};

use log::trace;
use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Dir, Link, Node};
use crate::position::{Position, add_axes, checked_add_axes, lead, neg_axes, sub_axes};
use crate::{AllocationMode, TreeError};

/// Path stack capacity. An AVL tree addressable by 32-bit handles is at most
/// 46 levels deep. Must be a length `smallvec::Array` is implemented for.
pub(crate) const MAX_HEIGHT: usize = 64;

/// Source of versions for every tree, so two trees that have been modified
/// never share a version.
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Ancestors visited by a descent, with the side taken at each.
pub(crate) type Path = SmallVec<[(Handle, Dir); MAX_HEIGHT]>;

/// A node together with its absolute start and end on every axis.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Located<P, const N: usize> {
    pub(crate) handle: Handle,
    pub(crate) start: [P; N],
    pub(crate) end: [P; N],
}

impl<P: Position, const N: usize> Located<P, N> {
    #[inline]
    pub(crate) fn length(&self) -> [P; N] {
        sub_axes(self.end, self.start)
    }
}

/// Which candidate a [`RawTree::seek`] keeps.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Seek {
    Exact,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// Result of a mutation descent: either the matching node, or the vacant slot
/// where a new node belongs.
pub(crate) struct Descent<P, const N: usize> {
    pub(crate) path: Path,
    pub(crate) found: Option<Located<P, N>>,
    // Start of the last node on the path.
    parent_start: [P; N],
    // Start a node inserted into the vacant slot would take: the start of its
    // in-order successor, or the extent.
    start: [P; N],
}

/// Probe ordering a borrowed key against node keys, ignoring positions.
pub(crate) fn by_key<K, Q, P, const N: usize>(key: &Q) -> impl Fn(&K, &[P; N]) -> Ordering
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    move |k, _| key.cmp(k.borrow())
}

/// Probe ordering a position against node starts on one axis.
pub(crate) fn by_start<K, P: Position, const N: usize>(position: P, axis: usize) -> impl Fn(&K, &[P; N]) -> Ordering {
    move |_, start| position.cmp(&start[axis])
}

/// Probe for inserting before the node that starts at `position` on `axis`
/// (or at the end when `position` is the extent).
pub(crate) fn before_start<K, P: Position, const N: usize>(position: P, axis: usize) -> impl Fn(&K, &[P; N]) -> Ordering {
    move |_, start| if position <= start[axis] { Ordering::Less } else { Ordering::Greater }
}

/// The threaded AVL engine backing every collection.
///
/// `K` is the key (`()` for range maps), `V` the payload (`()` for key-only
/// collections), `P` the position width and `N` the number of offset axes.
#[derive(Clone)]
pub(crate) struct RawTree<K, V, P, const N: usize> {
    pub(super) nodes: Arena<Node<K, V, P, N>>,
    pub(super) root: Option<Handle>,
    len: usize,
    extent: [P; N],
    version: u64,
}

impl<K, V, P: Position, const N: usize> RawTree<K, V, P, N> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            extent: [P::ZERO; N],
            version: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            nodes: Arena::with_capacity(capacity, mode)?,
            ..Self::new()
        })
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn extent(&self) -> [P; N] {
        self.extent
    }

    /// Mutation stamp; changes whenever the structure or any length changes.
    /// Zero only for a tree that has never been modified, and otherwise unique
    /// across all trees.
    pub(crate) const fn version(&self) -> u64 {
        self.version
    }

    pub(crate) const fn mode(&self) -> AllocationMode {
        self.nodes.mode()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub(crate) const fn free_count(&self) -> usize {
        self.nodes.free_len()
    }

    pub(crate) fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        self.nodes.ensure_free(count)
    }

    pub(crate) fn clear(&mut self) {
        trace!("clearing tree of {} nodes", self.len);
        self.nodes.clear();
        self.root = None;
        self.len = 0;
        self.extent = [P::ZERO; N];
        self.bump_version();
    }

    pub(crate) const fn root(&self) -> Option<Handle> {
        self.root
    }

    #[inline]
    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V, P, N> {
        self.nodes.get(handle)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, handle: Handle) -> &mut Node<K, V, P, N> {
        self.nodes.get_mut(handle)
    }

    pub(crate) fn entry(&self, handle: Handle) -> (&K, &V) {
        let node = self.node(handle);
        (&node.key, &node.value)
    }

    pub(crate) fn entry_mut(&mut self, handle: Handle) -> (&K, &mut V) {
        let node = self.node_mut(handle);
        (&node.key, &mut node.value)
    }

    #[inline]
    fn bump_version(&mut self) {
        self.version = NEXT_VERSION.fetch_add(1, atomic::Ordering::Relaxed);
    }

    /// In-order neighbour of `handle` on side `dir`, found through threads.
    pub(crate) fn step(&self, handle: Handle, dir: Dir) -> Option<Handle> {
        match self.node(handle).link(dir) {
            Link::Thread(neighbour) => neighbour,
            Link::Child(child) => Some(self.extreme(child, dir.opposite())),
        }
    }

    /// Last node reached by following children on side `dir` from `handle`.
    pub(super) fn extreme(&self, mut handle: Handle, dir: Dir) -> Handle {
        while let Link::Child(next) = self.node(handle).link(dir) {
            handle = next;
        }
        handle
    }

    /// First (`Dir::Left`) or last (`Dir::Right`) node.
    pub(crate) fn edge(&self, dir: Dir) -> Option<Located<P, N>> {
        let mut handle = self.root?;
        let mut start = self.node(handle).offset;
        let mut bound = self.extent;
        while let Link::Child(next) = self.node(handle).link(dir) {
            if dir == Dir::Left {
                bound = start;
            }
            start = add_axes(start, self.node(next).offset);
            handle = next;
        }
        Some(Located {
            handle,
            start,
            end: self.end_of(handle, start, bound),
        })
    }

    /// End of the node at `start`. `bound` is the start of the nearest ancestor
    /// the node lies to the left of (or the extent), which is its successor
    /// when it has no right subtree.
    pub(crate) fn end_of(&self, handle: Handle, start: [P; N], bound: [P; N]) -> [P; N] {
        let Link::Child(right) = self.node(handle).right else {
            return bound;
        };
        let mut handle = right;
        let mut position = add_axes(start, self.node(right).offset);
        while let Link::Child(left) = self.node(handle).left {
            position = add_axes(position, self.node(left).offset);
            handle = left;
        }
        position
    }

    /// Top-down search without mutation.
    ///
    /// `probe` compares the target against a node's key and start, returning
    /// `Less` when the target sorts before the node.
    pub(crate) fn seek(&self, mut probe: impl FnMut(&K, &[P; N]) -> Ordering, mode: Seek) -> Option<Located<P, N>> {
        let mut current = self.root;
        let mut start = [P::ZERO; N];
        let mut bound = self.extent;
        let mut best = None;

        while let Some(handle) = current {
            let node = self.node(handle);
            start = add_axes(start, node.offset);
            let ordering = probe(&node.key, &start);
            let hit = match mode {
                Seek::Exact => ordering == Ordering::Equal,
                Seek::Less => ordering == Ordering::Greater,
                Seek::LessOrEqual => ordering != Ordering::Less,
                Seek::Greater => ordering == Ordering::Less,
                Seek::GreaterOrEqual => ordering != Ordering::Greater,
            };
            if hit {
                best = Some((handle, start, bound));
                if ordering == Ordering::Equal {
                    break;
                }
            }
            let go_left = match ordering {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => mode == Seek::Less,
            };
            if go_left {
                bound = start;
                current = node.left.child();
            } else {
                current = node.right.child();
            }
        }

        best.map(|(handle, start, bound)| Located {
            handle,
            start,
            end: self.end_of(handle, start, bound),
        })
    }

    /// Descends towards the target, recording the path for a later
    /// [`insert`](Self::insert) or [`remove`](Self::remove).
    pub(crate) fn descend(&self, mut probe: impl FnMut(&K, &[P; N]) -> Ordering) -> Descent<P, N> {
        let mut path = Path::new();
        let mut current = self.root;
        let mut start = [P::ZERO; N];
        let mut parent_start = [P::ZERO; N];
        let mut bound = self.extent;

        while let Some(handle) = current {
            let node = self.node(handle);
            start = add_axes(start, node.offset);
            match probe(&node.key, &start) {
                Ordering::Equal => {
                    let found = Located {
                        handle,
                        start,
                        end: self.end_of(handle, start, bound),
                    };
                    return Descent {
                        path,
                        found: Some(found),
                        parent_start,
                        start,
                    };
                }
                Ordering::Less => {
                    path.push((handle, Dir::Left));
                    bound = start;
                    current = node.left.child();
                }
                Ordering::Greater => {
                    path.push((handle, Dir::Right));
                    current = node.right.child();
                }
            }
            parent_start = start;
        }

        Descent {
            path,
            found: None,
            parent_start,
            start: bound,
        }
    }

    /// Links a new node into the vacant slot found by `descent` and pushes
    /// every later node forward by `length`.
    ///
    /// All checks and the allocation happen before the tree is touched.
    pub(crate) fn insert(&mut self, descent: Descent<P, N>, key: K, value: V, length: [P; N]) -> Result<Handle, TreeError> {
        debug_assert!(descent.found.is_none(), "`RawTree::insert()` - slot is occupied!");
        if length.iter().any(|&axis| axis <= P::ZERO) {
            return Err(TreeError::OutOfRange("length must be positive"));
        }
        let extent = checked_add_axes(self.extent, length).ok_or(TreeError::Overflow)?;
        let handle = self.nodes.alloc(Node::new(key, value))?;
        let Descent {
            mut path,
            parent_start,
            start,
            ..
        } = descent;

        self.shift(lead(&start), length);
        match path.last().copied() {
            None => {
                self.node_mut(handle).offset = start;
                self.root = Some(handle);
            }
            Some((parent, dir)) => {
                // The parent moved with the shift if it lies after the new node.
                let parent_start = if lead(&parent_start) >= lead(&start) {
                    add_axes(parent_start, length)
                } else {
                    parent_start
                };
                let parent_node = self.node_mut(parent);
                let inherited = parent_node.link(dir);
                *parent_node.link_mut(dir) = Link::Child(handle);

                let node = self.node_mut(handle);
                node.offset = sub_axes(start, parent_start);
                *node.link_mut(dir) = inherited;
                *node.link_mut(dir.opposite()) = Link::Thread(Some(parent));
            }
        }

        self.extent = extent;
        self.len += 1;
        self.bump_version();
        trace!("inserted node {handle:?} at {start:?} with length {length:?}");
        self.rebalance_after_insert(&mut path);
        Ok(handle)
    }

    /// Unlinks the node found by `descent` and pulls every later node back by
    /// its length. Returns `None` when the descent found nothing.
    pub(crate) fn remove(&mut self, descent: Descent<P, N>) -> Option<(K, V)> {
        let Descent { mut path, found, .. } = descent;
        let at = found?;
        let length = at.length();

        // The node becomes zero-length and shares its start with its successor.
        self.shift(lead(&at.end), neg_axes(length));
        self.unlink(&mut path, at.handle);

        self.extent = sub_axes(self.extent, length);
        self.len -= 1;
        self.bump_version();
        trace!("removed node {:?} at {:?} with length {length:?}", at.handle, at.start);
        self.rebalance_after_remove(&mut path);

        let node = self.nodes.release(at.handle);
        Some((node.key, node.value))
    }

    /// Changes the length of the node at `at`, moving every later node.
    pub(crate) fn resize(&mut self, at: &Located<P, N>, length: [P; N]) -> Result<(), TreeError> {
        if length.iter().any(|&axis| axis <= P::ZERO) {
            return Err(TreeError::OutOfRange("length must be positive"));
        }
        let delta = sub_axes(length, at.length());
        let extent = checked_add_axes(self.extent, delta).ok_or(TreeError::Overflow)?;

        self.shift(lead(&at.end), delta);
        self.extent = extent;
        self.bump_version();
        trace!("resized node {:?} at {:?} by {delta:?}", at.handle, at.start);
        Ok(())
    }

    /// Points the link that owned a subtree (the side of `parent` recorded in
    /// the path, or the root) at `link`.
    pub(super) fn set_link(&mut self, parent: Option<(Handle, Dir)>, link: Link) {
        match parent {
            None => self.root = link.child(),
            Some((parent, dir)) => *self.node_mut(parent).link_mut(dir) = link,
        }
    }

    /// Structural removal of `handle`, whose ancestors are `path`. On return
    /// `path` ends at the node whose subtree lost a level on the recorded side.
    ///
    /// Expects the node's length to already be zero, so a promoted successor
    /// keeps the same start and no offset below it changes.
    fn unlink(&mut self, path: &mut Path, handle: Handle) {
        let parent = path.last().copied();
        let node = self.node(handle);
        let (left, right, offset, balance) = (node.left, node.right, node.offset, node.balance);

        match (left, right) {
            (Link::Thread(predecessor), Link::Thread(successor)) => {
                let link = match parent {
                    Some((_, Dir::Left)) => Link::Thread(predecessor),
                    Some((_, Dir::Right)) => Link::Thread(successor),
                    None => Link::Thread(None),
                };
                self.set_link(parent, link);
            }
            (Link::Child(child), Link::Thread(successor)) => {
                let last = self.extreme(child, Dir::Right);
                self.node_mut(last).right = Link::Thread(successor);
                let child_node = self.node_mut(child);
                child_node.offset = add_axes(child_node.offset, offset);
                self.set_link(parent, Link::Child(child));
            }
            (Link::Thread(predecessor), Link::Child(child)) => {
                let first = self.extreme(child, Dir::Left);
                self.node_mut(first).left = Link::Thread(predecessor);
                let child_node = self.node_mut(child);
                child_node.offset = add_axes(child_node.offset, offset);
                self.set_link(parent, Link::Child(child));
            }
            (Link::Child(left), Link::Child(right)) => {
                let slot = path.len();
                path.push((handle, Dir::Right));

                let mut successor_parent = handle;
                let mut successor = right;
                while let Link::Child(next) = self.node(successor).left {
                    path.push((successor, Dir::Left));
                    successor_parent = successor;
                    successor = next;
                }

                if successor_parent != handle {
                    let successor_node = self.node(successor);
                    let (successor_right, successor_offset) = (successor_node.right, successor_node.offset);
                    let detached = match successor_right {
                        Link::Child(grandchild) => {
                            let grandchild_node = self.node_mut(grandchild);
                            grandchild_node.offset = add_axes(grandchild_node.offset, successor_offset);
                            Link::Child(grandchild)
                        }
                        Link::Thread(_) => Link::Thread(Some(successor)),
                    };
                    self.node_mut(successor_parent).left = detached;
                    self.node_mut(successor).right = Link::Child(right);
                }

                let last = self.extreme(left, Dir::Right);
                self.node_mut(last).right = Link::Thread(Some(successor));

                let successor_node = self.node_mut(successor);
                successor_node.left = Link::Child(left);
                successor_node.balance = balance;
                successor_node.offset = offset;
                path[slot].0 = successor;
                self.set_link(parent, Link::Child(successor));
            }
        }
    }
}
