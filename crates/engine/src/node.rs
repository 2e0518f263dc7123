//! Layout node storage: authored fields plus memoized derived values.

use crate::canvas::CanvasId;
use crate::dirty::DirtyFlags;
use glam::{Mat4, Quat, Vec2, Vec3};
use rectlayout_core::{default_offset, Anchor, Edges, Offset, Rect, DEFAULT_PIVOT, EPSILON};
use std::cell::Cell;

slotmap::new_key_type! {
    /// Stable handle to a node in a [`LayoutTree`](crate::LayoutTree).
    pub struct NodeId;
}

/// World-space transform extracted from a node's viewport matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    /// Viewport-space position of the pivot point (z carries `pos_z`).
    pub position: Vec3,
    /// Accumulated rotation.
    pub rotation: Quat,
    /// Accumulated scale, device scale included.
    pub scale: Vec3,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// A rect-transform node.
///
/// Authored fields are only changed through the tree's mutators so that the
/// dirty bits stay truthful. Derived values live in [`Cell`]s and are filled
/// lazily by the resolver.
#[derive(Debug)]
pub struct LayoutNode {
    pub(crate) anchor: Anchor,
    pub(crate) offset: Offset,
    pub(crate) pivot: Vec2,
    pub(crate) rotation: Quat,
    pub(crate) scale: Vec3,
    pub(crate) pos_z: f32,

    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) canvas: Option<CanvasId>,

    pub(crate) dirty: Cell<DirtyFlags>,
    pub(crate) rect: Cell<Rect>,
    /// Anchor reference point inside the parent, captured with the rect.
    pub(crate) anchor_reference: Cell<Vec2>,
    pub(crate) local_matrix: Cell<Mat4>,
    pub(crate) canvas_matrix: Cell<Mat4>,
    pub(crate) viewport_matrix: Cell<Mat4>,
    pub(crate) world: Cell<WorldTransform>,
}

impl LayoutNode {
    /// Fresh node: centered point anchor, centered pivot, default size, fully dirty.
    pub(crate) fn new() -> Self {
        Self {
            anchor: Edges::CENTER,
            offset: default_offset(),
            pivot: DEFAULT_PIVOT,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            pos_z: 0.0,
            parent: None,
            children: Vec::new(),
            canvas: None,
            dirty: Cell::new(DirtyFlags::all()),
            rect: Cell::new(Rect::ZERO),
            anchor_reference: Cell::new(Vec2::ZERO),
            local_matrix: Cell::new(Mat4::IDENTITY),
            canvas_matrix: Cell::new(Mat4::IDENTITY),
            viewport_matrix: Cell::new(Mat4::IDENTITY),
            world: Cell::new(WorldTransform::default()),
        }
    }

    /// Node that fills its canvas' design rect.
    pub(crate) fn canvas_root(canvas: CanvasId) -> Self {
        Self {
            anchor: Edges::STRETCH,
            offset: Edges::ZERO,
            canvas: Some(canvas),
            ..Self::new()
        }
    }

    /// Anchor fractions.
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Absolute edge offsets.
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Normalized pivot.
    pub fn pivot(&self) -> Vec2 {
        self.pivot
    }

    /// Local rotation.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Depth component of the local position.
    pub fn pos_z(&self) -> f32 {
        self.pos_z
    }

    /// Parent handle, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Canvas this node resolves against, cached at attach time.
    pub fn canvas(&self) -> Option<CanvasId> {
        self.canvas
    }

    /// Current dirty bits.
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty.get()
    }

    /// True when the node carries a non-identity rotation or scale.
    pub fn has_local_transform(&self) -> bool {
        let rotated = !self.rotation.abs_diff_eq(Quat::IDENTITY, EPSILON)
            && !self.rotation.abs_diff_eq(-Quat::IDENTITY, EPSILON);
        rotated || !self.scale.abs_diff_eq(Vec3::ONE, EPSILON)
    }

    #[inline]
    pub(crate) fn is_dirty(&self, flags: DirtyFlags) -> bool {
        self.dirty.get().intersects(flags)
    }

    #[inline]
    pub(crate) fn mark(&self, flags: DirtyFlags) {
        self.dirty.set(self.dirty.get() | flags);
    }

    #[inline]
    pub(crate) fn clear(&self, flags: DirtyFlags) {
        self.dirty.set(self.dirty.get() - flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_is_fully_dirty_with_defaults() {
        let node = LayoutNode::new();
        assert_eq!(node.dirty_flags(), DirtyFlags::all());
        assert_eq!(node.anchor(), Edges::CENTER);
        assert_eq!(node.pivot(), Vec2::splat(0.5));
        assert!(!node.has_local_transform());
    }

    #[test]
    fn local_transform_detection() {
        let mut node = LayoutNode::new();
        node.scale = Vec3::new(2.0, 1.0, 1.0);
        assert!(node.has_local_transform());

        node.scale = Vec3::ONE;
        node.rotation = Quat::from_rotation_z(0.3);
        assert!(node.has_local_transform());

        node.rotation = -Quat::IDENTITY;
        assert!(!node.has_local_transform());
    }
}
