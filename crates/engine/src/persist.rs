//! Capture and restore of a node's authored layout fields.

use crate::dirty::Recompute;
use crate::node::NodeId;
use crate::tree::LayoutTree;
use glam::Vec2;
use rectlayout_core::RectTransformData;
use tracing::debug;

impl LayoutTree {
    /// Authored anchor, offset, pivot and depth of `id`, with the current
    /// resolved size.
    pub fn capture(&self, id: NodeId) -> Option<RectTransformData> {
        let node = self.nodes.get(id)?;
        let size = self.resolve_rect(id).size();
        Some(RectTransformData {
            anchor: node.anchor.to_array(),
            offset: node.offset.to_array(),
            pivot: node.pivot.to_array(),
            pos_z: node.pos_z,
            size: size.to_array(),
        })
    }

    /// Restore previously captured fields.
    ///
    /// Anchor, offset and pivot are written as-is; the stored size is then
    /// re-applied through [`set_size`](Self::set_size), which only touches
    /// collapsed anchor axes, so stretched offsets survive even when the
    /// parent is currently too small for them.
    pub fn apply_data(&mut self, id: NodeId, data: &RectTransformData) {
        let Some(node) = self.nodes.get_mut(id) else {
            debug!(?id, "apply_data on missing node ignored");
            return;
        };
        node.anchor = data.anchor().clamp01().pin_inverted(&node.anchor);
        let offset = data.offset();
        if offset.to_vec4().is_finite() {
            node.offset = offset;
        }
        let pivot = data.pivot();
        if pivot.is_finite() {
            node.pivot = pivot.clamp(Vec2::ZERO, Vec2::ONE);
        }
        if data.pos_z.is_finite() {
            node.pos_z = data.pos_z;
        }
        self.set_recompute(id, Recompute::RectAndTransform);
        self.set_size(id, data.size());
    }
}
