//! Invalidation policy.
//!
//! Every mutation funnels into [`LayoutTree::set_recompute`], which marks the
//! node and its whole subtree before returning. Reads then recompute lazily.

use crate::canvas::CanvasId;
use crate::node::NodeId;
use crate::tree::LayoutTree;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Per-node cache invalidation bits.
    pub struct DirtyFlags: u8 {
        /// Resolved rect (and anchor reference point).
        const RECT = 0b0000_0001;
        /// Pivot-space rotate/scale matrix.
        const LOCAL = 0b0000_0010;
        /// Accumulated canvas-space matrix.
        const CANVAS = 0b0000_0100;
        /// Viewport matrix and the world values decomposed from it.
        const VIEWPORT = 0b0000_1000;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        DirtyFlags::empty()
    }
}

/// What a mutation invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    /// Edges moved; matrices are unaffected unless a rotation/scale is involved.
    RectOnly,
    /// Rotation, scale, pivot or depth changed.
    TransformOnly,
    /// Both of the above.
    RectAndTransform,
}

impl Recompute {
    /// Cache bits cleared by this kind of change.
    ///
    /// World values depend on the pivot point inside the rect, so a rect
    /// change also dirties the viewport cache.
    pub fn flags(self) -> DirtyFlags {
        match self {
            Recompute::RectOnly => DirtyFlags::RECT | DirtyFlags::VIEWPORT,
            Recompute::TransformOnly => {
                DirtyFlags::LOCAL | DirtyFlags::CANVAS | DirtyFlags::VIEWPORT
            }
            Recompute::RectAndTransform => DirtyFlags::all(),
        }
    }

    /// Under a rotated or scaled node a rect change perturbs matrices too.
    pub fn escalated(self) -> Self {
        match self {
            Recompute::RectOnly => Recompute::RectAndTransform,
            other => other,
        }
    }
}

impl LayoutTree {
    /// Invalidate `id` and every descendant.
    ///
    /// `RectOnly` escalates to `RectAndTransform` when the node or one of its
    /// ancestors carries rotation/scale; the check repeats at every level on
    /// the way down. Subtrees already holding the requested bits are skipped.
    pub fn set_recompute(&mut self, id: NodeId, flag: Recompute) {
        self.propagate_dirty(id, flag);
    }

    pub(crate) fn propagate_dirty(&self, id: NodeId, flag: Recompute) {
        if !self.nodes.contains_key(id) {
            return;
        }
        let flag = if flag == Recompute::RectOnly && self.chain_has_transform(id) {
            flag.escalated()
        } else {
            flag
        };
        let mut stack = vec![(id, flag)];
        while let Some((current, flag)) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            let flag = if node.has_local_transform() {
                flag.escalated()
            } else {
                flag
            };
            let bits = flag.flags();
            if node.dirty.get().contains(bits) {
                continue;
            }
            node.mark(bits);
            stack.extend(node.children.iter().map(|&child| (child, flag)));
        }
    }

    /// True when `id` or any ancestor has a non-identity rotation/scale.
    pub(crate) fn chain_has_transform(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(current) else {
                return false;
            };
            if node.has_local_transform() {
                return true;
            }
            cursor = node.parent;
        }
        false
    }

    /// Mark every bit on every node of a subtree, ignoring the short-circuit.
    /// Used when the resolution context itself changes (attach/detach).
    pub(crate) fn invalidate_subtree(&self, root: NodeId) {
        for id in self.subtree(root) {
            if let Some(node) = self.nodes.get(id) {
                node.mark(DirtyFlags::all());
            }
        }
    }

    /// Full `RectAndTransform` invalidation of every node bound to `canvas`.
    pub(crate) fn invalidate_canvas(&self, canvas: CanvasId) {
        for node in self.nodes.values() {
            if node.canvas == Some(canvas) {
                node.mark(DirtyFlags::all());
            }
        }
    }
}
