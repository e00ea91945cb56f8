use super::handle::Handle;
use super::node::Link;
use super::raw_tree::RawTree;
use crate::position::{Position, add_axes, lead, sub_axes};

impl<K, V, P: Position, const N: usize> RawTree<K, V, P, N> {
    /// Moves every node whose first-axis start is at or after `at` by `delta`
    /// on all axes, touching a single root-to-leaf path.
    ///
    /// A node at or after `at` carries its whole subtree along; its left
    /// subtree is compensated and searched next. A node before `at` keeps its
    /// place and the walk continues into its right subtree.
    pub(crate) fn shift(&mut self, at: P, delta: [P; N]) {
        if N == 0 {
            return;
        }
        let Some(root) = self.root else {
            return;
        };
        let mut current: Option<(Handle, P)> = Some((root, lead(&self.node(root).offset)));

        while let Some((handle, position)) = current {
            let node = self.node_mut(handle);
            current = if position >= at {
                node.offset = add_axes(node.offset, delta);
                let left = node.left;
                match left {
                    Link::Child(left) => {
                        let left_node = self.node_mut(left);
                        // Positions are tracked from the offsets before the shift.
                        let left_position = position + lead(&left_node.offset);
                        left_node.offset = sub_axes(left_node.offset, delta);
                        Some((left, left_position))
                    }
                    Link::Thread(_) => None,
                }
            } else {
                let right = node.right;
                match right {
                    Link::Child(right) => Some((right, position + lead(&self.node(right).offset))),
                    Link::Thread(_) => None,
                }
            };
        }
    }
}
