use super::handle::Handle;
use super::node::{Dir, Link};
use super::raw_tree::{Path, RawTree};
use crate::position::{Position, add_axes, neg_axes};

impl<K, V, P: Position, const N: usize> RawTree<K, V, P, N> {
    /// Walks `path` upwards after a node was added below it, fixing balance
    /// factors until a subtree's height stops changing.
    pub(super) fn rebalance_after_insert(&mut self, path: &mut Path) {
        while let Some((handle, dir)) = path.pop() {
            let node = self.node_mut(handle);
            node.balance += dir.sign();
            match node.balance {
                0 => return,
                -1 | 1 => {}
                _ => {
                    // An insertion rotation always restores the old height.
                    let (top, _) = self.restore(handle);
                    self.set_link(path.last().copied(), Link::Child(top));
                    return;
                }
            }
        }
    }

    /// Walks `path` upwards after a node was removed below it. Unlike insertion
    /// this may rotate at several levels.
    pub(super) fn rebalance_after_remove(&mut self, path: &mut Path) {
        while let Some((handle, dir)) = path.pop() {
            let node = self.node_mut(handle);
            node.balance -= dir.sign();
            match node.balance {
                -1 | 1 => return,
                0 => {}
                _ => {
                    let (top, shrank) = self.restore(handle);
                    self.set_link(path.last().copied(), Link::Child(top));
                    if !shrank {
                        return;
                    }
                }
            }
        }
    }

    /// Rotates a node whose balance reached ±2. Returns the new subtree root
    /// and whether the subtree is now one level shorter.
    fn restore(&mut self, handle: Handle) -> (Handle, bool) {
        let heavy = if self.node(handle).balance > 0 { Dir::Right } else { Dir::Left };
        let sign = heavy.sign();
        let Link::Child(child) = self.node(handle).link(heavy) else {
            unreachable!("`RawTree::restore()` - heavy side has no child!");
        };
        let child_balance = self.node(child).balance;

        if child_balance != -sign {
            // Single rotation.
            let top = self.rotate(handle, heavy.opposite());
            if child_balance == 0 {
                self.node_mut(handle).balance = sign;
                self.node_mut(child).balance = -sign;
                (top, false)
            } else {
                self.node_mut(handle).balance = 0;
                self.node_mut(child).balance = 0;
                (top, true)
            }
        } else {
            // Double rotation through the inner grandchild.
            let Link::Child(grandchild) = self.node(child).link(heavy.opposite()) else {
                unreachable!("`RawTree::restore()` - inner side has no grandchild!");
            };
            let grandchild_balance = self.node(grandchild).balance;
            let inner = self.rotate(child, heavy);
            *self.node_mut(handle).link_mut(heavy) = Link::Child(inner);
            let top = self.rotate(handle, heavy.opposite());

            self.node_mut(handle).balance = if grandchild_balance == sign { -sign } else { 0 };
            self.node_mut(child).balance = if grandchild_balance == -sign { sign } else { 0 };
            self.node_mut(grandchild).balance = 0;
            (top, true)
        }
    }

    /// Rotates the subtree at `top` towards `dir`; the child on the opposite
    /// side rises and is returned. Balance factors are left to the caller.
    ///
    /// The rising child's offset absorbs the old top's offset, the old top's
    /// offset becomes the negated child offset, and the subtree that changes
    /// parents absorbs the child's offset.
    fn rotate(&mut self, top: Handle, dir: Dir) -> Handle {
        let rise = dir.opposite();
        let Link::Child(child) = self.node(top).link(rise) else {
            unreachable!("`RawTree::rotate()` - no child to rotate up!");
        };
        let top_offset = self.node(top).offset;
        let child_offset = self.node(child).offset;

        let moved = match self.node(child).link(dir) {
            Link::Child(inner) => {
                let inner_node = self.node_mut(inner);
                inner_node.offset = add_axes(inner_node.offset, child_offset);
                Link::Child(inner)
            }
            // `top` loses its child on this side; its neighbour there is `child`.
            Link::Thread(_) => Link::Thread(Some(child)),
        };
        *self.node_mut(top).link_mut(rise) = moved;

        let child_node = self.node_mut(child);
        *child_node.link_mut(dir) = Link::Child(top);
        child_node.offset = add_axes(top_offset, child_offset);
        self.node_mut(top).offset = neg_axes(child_offset);
        child
    }
}
