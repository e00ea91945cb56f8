use super::handle::Handle;
use crate::position::Position;

/// One side of a node.
///
/// `Child` owns a subtree. `Thread` is a non-owning reference to the in-order
/// neighbour on that side (predecessor on the left, successor on the right),
/// `None` at either end of the tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Link {
    Child(Handle),
    Thread(Option<Handle>),
}

impl Link {
    #[inline]
    pub(crate) const fn child(self) -> Option<Handle> {
        match self {
            Link::Child(handle) => Some(handle),
            Link::Thread(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Dir {
    Left,
    Right,
}

impl Dir {
    #[inline]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// Balance contribution of growing this side by one level.
    #[inline]
    pub(crate) const fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

/// A tree node. `offset` holds, per axis, this node's start minus its parent's
/// start; absolute positions exist only as sums along a root path.
#[derive(Clone, Debug)]
pub(crate) struct Node<K, V, P, const N: usize> {
    pub(crate) left: Link,
    pub(crate) right: Link,
    // height(right) - height(left)
    pub(crate) balance: i8,
    pub(crate) offset: [P; N],
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V, P: Position, const N: usize> Node<K, V, P, N> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            left: Link::Thread(None),
            right: Link::Thread(None),
            balance: 0,
            offset: [P::ZERO; N],
            key,
            value,
        }
    }

    #[inline]
    pub(crate) const fn link(&self, dir: Dir) -> Link {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn link_mut(&mut self, dir: Dir) -> &mut Link {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }
}
