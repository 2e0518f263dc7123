//! Mutation API used by widgets and loaders.
//!
//! Inputs are corrected, never rejected. A mutator only invalidates caches
//! when the effective stored value actually changed.

use crate::canvas::CanvasId;
use crate::dirty::Recompute;
use crate::node::NodeId;
use crate::tree::LayoutTree;
use glam::{Quat, Vec2, Vec3};
use rectlayout_core::{Anchor, Edges, Offset, EPSILON};
use tracing::{debug, info};

impl LayoutTree {
    /// Move the anchor box while keeping the node visually in place.
    ///
    /// The anchor is clamped to `[0, 1]` and inverted pairs are pinned to the
    /// edge that moved. Offsets absorb the anchor delta so the resolved rect is
    /// unchanged; on an axis whose anchor collapsed to a point, inverted
    /// offsets are averaged.
    pub fn set_anchor(&mut self, id: NodeId, anchor: impl Into<Anchor>) {
        let Some(node) = self.nodes.get(id) else {
            debug!(?id, "set_anchor on missing node ignored");
            return;
        };
        let old_anchor = node.anchor;
        let old_offset = node.offset;
        let anchor = anchor.into().clamp01().pin_inverted(&old_anchor);
        let parent = self.parent_size(id);

        let mut offset = Edges::new(
            old_offset.left - parent.x * (anchor.left - old_anchor.left),
            old_offset.top - parent.y * (anchor.top - old_anchor.top),
            old_offset.right - parent.x * (anchor.right - old_anchor.right),
            old_offset.bottom - parent.y * (anchor.bottom - old_anchor.bottom),
        );
        if anchor.is_collapsed_x() && offset.left > offset.right {
            let mid = (offset.left + offset.right) * 0.5;
            offset.left = mid;
            offset.right = mid;
        }
        if anchor.is_collapsed_y() && offset.top > offset.bottom {
            let mid = (offset.top + offset.bottom) * 0.5;
            offset.top = mid;
            offset.bottom = mid;
        }

        if anchor == old_anchor && offset == old_offset {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.anchor = anchor;
            node.offset = offset;
        }
        self.set_recompute(id, Recompute::RectOnly);
    }

    /// Replace the offsets. Requires a parent node.
    ///
    /// When the implied edges would invert on an axis:
    /// - both edges changed: they meet at `min * (1 - pivot) + max * pivot`;
    /// - only the min edge changed: it is clamped onto the max edge;
    /// - otherwise the max edge is clamped onto the min edge.
    pub fn set_offset(&mut self, id: NodeId, offset: impl Into<Offset>) {
        let Some(node) = self.nodes.get(id) else {
            debug!(?id, "set_offset on missing node ignored");
            return;
        };
        let Some(parent) = node.parent else {
            debug!(?id, "set_offset without a parent ignored");
            return;
        };
        let requested = offset.into();
        if !requested.to_vec4().is_finite() {
            debug!(?id, ?requested, "non-finite offset ignored");
            return;
        }
        let anchor = node.anchor;
        let old = node.offset;
        let pivot = node.pivot;
        let parent_rect = self.resolve_rect(parent);

        let (left, right) = correct_axis(
            AxisBase::new(parent_rect.left, parent_rect.width(), anchor.left, anchor.right),
            (requested.left, requested.right),
            (old.left, old.right),
            pivot.x,
        );
        let (top, bottom) = correct_axis(
            AxisBase::new(parent_rect.top, parent_rect.height(), anchor.top, anchor.bottom),
            (requested.top, requested.bottom),
            (old.top, old.bottom),
            pivot.y,
        );
        let offset = Edges::new(left, top, right, bottom);
        if offset == old {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.offset = offset;
        }
        self.set_recompute(id, Recompute::RectOnly);
    }

    /// Resize on axes whose anchor is collapsed to a point, keeping the pivot
    /// point fixed. Axes with a stretched anchor are sized by the anchor and
    /// their offsets are left exactly as they are, inverted or not. Requires
    /// a parent node, like [`set_offset`](Self::set_offset).
    pub fn set_size(&mut self, id: NodeId, size: Vec2) {
        let Some(node) = self.nodes.get(id) else {
            debug!(?id, "set_size on missing node ignored");
            return;
        };
        if node.parent.is_none() {
            debug!(?id, "set_size without a parent ignored");
            return;
        }
        let anchor = node.anchor;
        let size = Vec2::new(non_negative(size.x), non_negative(size.y));
        let pivot = node.pivot;
        let old = node.offset;
        let mut offset = old;
        // A collapsed axis has both anchor edges at one point, so a
        // non-negative offset span can never invert.
        if anchor.is_collapsed_x() {
            let shrink = (offset.right - offset.left) - size.x;
            offset.left += shrink * pivot.x;
            offset.right = offset.left + size.x;
        }
        if anchor.is_collapsed_y() {
            let shrink = (offset.bottom - offset.top) - size.y;
            offset.top += shrink * pivot.y;
            offset.bottom = offset.top + size.y;
        }
        if offset == old {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.offset = offset;
        }
        self.set_recompute(id, Recompute::RectOnly);
    }

    /// Move the pivot without moving what is drawn.
    ///
    /// With rotation or scale present the offsets shift so the transformed
    /// box stays put under the new pivot; otherwise only the reported
    /// position moves.
    pub fn set_pivot(&mut self, id: NodeId, pivot: Vec2) {
        let Some(node) = self.nodes.get(id) else {
            debug!(?id, "set_pivot on missing node ignored");
            return;
        };
        if !pivot.is_finite() {
            debug!(?id, ?pivot, "non-finite pivot ignored");
            return;
        }
        let pivot = pivot.clamp(Vec2::ZERO, Vec2::ONE);
        if pivot == node.pivot {
            return;
        }

        if !node.has_local_transform() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.pivot = pivot;
            }
            self.set_recompute(id, Recompute::TransformOnly);
            return;
        }

        // The new pivot point currently renders at `local * q`; after the
        // change it is a fixed point of the local matrix, so shift the rect
        // by the difference.
        let rect = self.resolve_rect(id);
        let local = self.resolve_local(id);
        let q = rect.point_at(pivot);
        let rendered = local.transform_point3(q.extend(0.0)).truncate();
        let shift = rendered - q;
        if let Some(node) = self.nodes.get_mut(id) {
            node.pivot = pivot;
            node.offset = node.offset.translate(shift);
        }
        self.set_recompute(id, Recompute::RectAndTransform);
    }

    /// Place the pivot at `position.xy` relative to the anchor reference
    /// point and store `position.z` as depth. The planar part requires a
    /// parent node, like [`set_offset`](Self::set_offset).
    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        let Some(current) = self.local_position(id) else {
            debug!(?id, "set_position on missing node ignored");
            return;
        };
        if !position.is_finite() {
            debug!(?id, ?position, "non-finite position ignored");
            return;
        }
        let has_parent = self.parent(id).is_some();
        let delta = (position - current).truncate();
        let planar = has_parent && delta != Vec2::ZERO;
        let depth = position.z != current.z;
        if !planar && !depth {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            if planar {
                node.offset = node.offset.translate(delta);
            }
            node.pos_z = position.z;
        }
        if planar {
            self.set_recompute(id, Recompute::RectOnly);
        } else {
            self.set_recompute(id, Recompute::TransformOnly);
        }
    }

    /// Set the local rotation. Degenerate quaternions are ignored.
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) {
        let Some(node) = self.nodes.get(id) else {
            debug!(?id, "set_rotation on missing node ignored");
            return;
        };
        if !rotation.is_finite() || rotation.length_squared() <= EPSILON {
            debug!(?id, ?rotation, "degenerate rotation ignored");
            return;
        }
        let rotation = rotation.normalize();
        if rotation == node.rotation {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.rotation = rotation;
        }
        self.set_recompute(id, Recompute::TransformOnly);
    }

    /// Set the local scale. Non-finite components are ignored.
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) {
        let Some(node) = self.nodes.get(id) else {
            debug!(?id, "set_scale on missing node ignored");
            return;
        };
        if !scale.is_finite() {
            debug!(?id, ?scale, "non-finite scale ignored");
            return;
        }
        if scale == node.scale {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.scale = scale;
        }
        self.set_recompute(id, Recompute::TransformOnly);
    }

    /// Change the authored design resolution and invalidate the whole canvas.
    pub fn set_design_canvas_size(&mut self, canvas: CanvasId, size: Vec2) {
        let Some(root) = self.canvases.get_mut(canvas) else {
            debug!(?canvas, "set_design_canvas_size on missing canvas ignored");
            return;
        };
        if root.set_design_size(size) {
            info!(?canvas, design = ?root.design_size(), "design canvas resized");
            self.invalidate_canvas(canvas);
        }
    }

    /// Change the device resolution and invalidate the whole canvas.
    pub fn set_target_canvas_size(&mut self, canvas: CanvasId, size: Vec2) {
        let Some(root) = self.canvases.get_mut(canvas) else {
            debug!(?canvas, "set_target_canvas_size on missing canvas ignored");
            return;
        };
        if root.set_target_size(size) {
            info!(?canvas, target = ?root.target_size(), "target canvas resized");
            self.invalidate_canvas(canvas);
        }
    }

    /// Size of the rect this node is anchored into.
    fn parent_size(&self, id: NodeId) -> Vec2 {
        let Some(node) = self.nodes.get(id) else {
            return Vec2::ZERO;
        };
        match node.parent {
            Some(parent) => self.resolve_rect(parent).size(),
            None => node
                .canvas
                .and_then(|canvas| self.canvases.get(canvas))
                .map(|canvas| canvas.design_size())
                .unwrap_or(Vec2::ZERO),
        }
    }
}

/// Absolute position of an axis' anchor edges inside the parent.
#[derive(Debug, Clone, Copy)]
struct AxisBase {
    min: f32,
    max: f32,
}

impl AxisBase {
    fn new(origin: f32, extent: f32, anchor_min: f32, anchor_max: f32) -> Self {
        Self {
            min: origin + extent * anchor_min,
            max: origin + extent * anchor_max,
        }
    }
}

fn correct_axis(base: AxisBase, requested: (f32, f32), previous: (f32, f32), pivot: f32) -> (f32, f32) {
    let (offset_min, offset_max) = requested;
    let edge_min = base.min + offset_min;
    let edge_max = base.max + offset_max;
    if edge_min <= edge_max {
        return requested;
    }
    let min_changed = offset_min != previous.0;
    let max_changed = offset_max != previous.1;
    if min_changed && max_changed {
        let meet = edge_min * (1.0 - pivot) + edge_max * pivot;
        (meet - base.min, meet - base.max)
    } else if min_changed {
        (edge_max - base.min, offset_max)
    } else {
        (offset_min, edge_min - base.max)
    }
}

fn non_negative(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use rectlayout_core::Rect;

    fn setup() -> (LayoutTree, CanvasId, NodeId, NodeId) {
        let mut tree = LayoutTree::new();
        let (canvas, root) = tree.create_canvas(Vec2::new(800.0, 600.0), Vec2::new(800.0, 600.0));
        let child = tree.create_child(root).unwrap();
        (tree, canvas, root, child)
    }

    #[test]
    fn set_anchor_keeps_rect_stable() {
        let (mut tree, _, _, child) = setup();
        let before = tree.rect(child).unwrap();
        tree.set_anchor(child, Vec4::new(0.0, 0.25, 1.0, 0.75));
        let node = tree.node(child).unwrap();
        assert_eq!(node.anchor(), Edges::new(0.0, 0.25, 1.0, 0.75));
        assert_eq!(node.offset(), Edges::new(350.0, 100.0, -350.0, -100.0));
        assert_eq!(tree.rect(child).unwrap(), before);
    }

    #[test]
    fn set_anchor_clamps_and_pins() {
        let (mut tree, _, _, child) = setup();
        tree.set_anchor(child, Vec4::new(-1.0, 0.5, 0.2, 2.0));
        let anchor = tree.node(child).unwrap().anchor();
        // left moved to 0 and right to 0.2; bottom clamped to 1.
        assert_eq!(anchor, Edges::new(0.0, 0.5, 0.2, 1.0));

        tree.set_anchor(child, Vec4::new(0.6, 0.5, 0.2, 1.0));
        let anchor = tree.node(child).unwrap().anchor();
        assert_eq!((anchor.left, anchor.right), (0.6, 0.6));
        assert!(tree.rect(child).unwrap().is_ordered());
    }

    #[test]
    fn set_anchor_averages_inverted_offsets_on_collapsed_axis() {
        let (mut tree, canvas, _, child) = setup();
        tree.set_anchor(child, Vec4::new(0.0, 0.5, 1.0, 0.5));
        // Stretched horizontally with a 100px node: offsets are now 350 / -350,
        // which invert once the parent shrinks to 100px.
        tree.set_design_canvas_size(canvas, Vec2::new(100.0, 600.0));
        tree.set_anchor(child, Vec4::new(0.5, 0.5, 0.5, 0.5));
        let offset = tree.node(child).unwrap().offset();
        assert_eq!((offset.left, offset.right), (0.0, 0.0));
        assert!(tree.rect(child).unwrap().is_ordered());
    }

    #[test]
    fn set_offset_needs_a_parent() {
        let (mut tree, _, root, _) = setup();
        let before = tree.node(root).unwrap().offset();
        tree.set_offset(root, Vec4::new(10.0, 10.0, -10.0, -10.0));
        assert_eq!(tree.node(root).unwrap().offset(), before);

        let orphan = tree.create_node();
        let before = tree.node(orphan).unwrap().offset();
        tree.set_offset(orphan, Vec4::splat(3.0));
        assert_eq!(tree.node(orphan).unwrap().offset(), before);
    }

    #[test]
    fn set_offset_blends_at_pivot_when_both_edges_cross() {
        let (mut tree, _, _, child) = setup();
        tree.set_pivot(child, Vec2::new(0.25, 0.5));
        // Left edge wants x=420, right wants x=380: meet at 420*0.75 + 380*0.25.
        tree.set_offset(child, Vec4::new(20.0, -50.0, -20.0, 50.0));
        let rect = tree.rect(child).unwrap();
        assert_eq!(rect.left, 410.0);
        assert_eq!(rect.right, 410.0);
    }

    #[test]
    fn set_offset_clamps_the_single_moved_edge() {
        let (mut tree, _, _, child) = setup();
        // Only the left edge moves past the right edge (x=450).
        tree.set_offset(child, Vec4::new(80.0, -50.0, 50.0, 50.0));
        let rect = tree.rect(child).unwrap();
        assert_eq!((rect.left, rect.right), (450.0, 450.0));

        // Reset, then move only the bottom edge above the top edge (y=250).
        tree.set_offset(child, Vec4::new(-50.0, -50.0, 50.0, 50.0));
        tree.set_offset(child, Vec4::new(-50.0, -50.0, 50.0, -70.0));
        let rect = tree.rect(child).unwrap();
        assert_eq!((rect.top, rect.bottom), (250.0, 250.0));
    }

    #[test]
    fn set_size_only_touches_collapsed_axes() {
        let (mut tree, _, _, child) = setup();
        tree.set_anchor(child, Vec4::new(0.0, 0.5, 1.0, 0.5));
        let width = tree.size(child).unwrap().x;
        tree.set_size(child, Vec2::new(40.0, 20.0));
        assert_eq!(tree.size(child).unwrap(), Vec2::new(width, 20.0));
    }

    #[test]
    fn set_size_leaves_inverted_stretched_axis_alone() {
        let (mut tree, canvas, _, child) = setup();
        tree.set_anchor(child, Vec4::new(0.0, 0.5, 1.0, 0.5));
        // 350 / -350 on a 100px parent: the x edges cross and collapse to 50.
        tree.set_design_canvas_size(canvas, Vec2::new(100.0, 600.0));
        let rect = tree.rect(child).unwrap();
        assert_eq!((rect.left, rect.right), (50.0, 50.0));

        tree.set_size(child, Vec2::new(999.0, 40.0));
        let offset = tree.node(child).unwrap().offset();
        assert_eq!((offset.left, offset.right), (350.0, -350.0));
        assert_eq!((offset.top, offset.bottom), (-20.0, 20.0));
        assert_eq!(tree.rect(child), Some(Rect::new(50.0, 280.0, 50.0, 320.0)));
    }

    #[test]
    fn set_size_on_stretched_node_does_not_invalidate() {
        let (mut tree, _, _, child) = setup();
        tree.set_anchor(child, Vec4::new(0.0, 0.0, 1.0, 1.0));
        tree.viewport_transform(child).unwrap();
        tree.set_size(child, Vec2::new(5.0, 5.0));
        assert!(tree.node(child).unwrap().dirty_flags().is_empty());
    }

    #[test]
    fn point_anchor_size_ignores_parent_size() {
        for design in [Vec2::new(800.0, 600.0), Vec2::new(13.0, 7.0), Vec2::ZERO] {
            let mut tree = LayoutTree::new();
            let (_, root) = tree.create_canvas(design, design);
            let child = tree.create_child(root).unwrap();
            tree.set_size(child, Vec2::new(40.0, 20.0));
            assert_eq!(tree.size(child), Some(Vec2::new(40.0, 20.0)));
        }
    }

    #[test]
    fn set_size_keeps_pivot_point() {
        let (mut tree, _, _, child) = setup();
        tree.set_pivot(child, Vec2::new(0.0, 1.0));
        let before = tree.world_position(child).unwrap();
        tree.set_size(child, Vec2::new(10.0, 30.0));
        assert_eq!(tree.size(child), Some(Vec2::new(10.0, 30.0)));
        assert_eq!(tree.world_position(child), Some(before));
        assert_eq!(tree.rect(child), Some(Rect::new(350.0, 320.0, 360.0, 350.0)));
    }

    #[test]
    fn pivot_change_without_transform_moves_position_only() {
        let (mut tree, _, _, child) = setup();
        let rect = tree.rect(child).unwrap();
        tree.set_pivot(child, Vec2::ZERO);
        assert_eq!(tree.world_position(child), Some(Vec3::new(350.0, 250.0, 0.0)));
        assert_eq!(tree.rect(child), Some(rect));
    }

    #[test]
    fn pivot_sweep_moves_world_position_by_rect_size() {
        let (mut tree, _, _, child) = setup();
        tree.set_anchor(child, Vec4::ZERO);
        tree.set_offset(child, Vec4::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(tree.rect(child), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));

        tree.set_pivot(child, Vec2::ZERO);
        let start = tree.world_position(child).unwrap();
        tree.set_pivot(child, Vec2::ONE);
        let end = tree.world_position(child).unwrap();
        assert_eq!(end - start, Vec3::new(100.0, 50.0, 0.0));
        assert_eq!(tree.rect(child), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
    }

    #[test]
    fn pivot_change_with_rotation_keeps_box_in_place() {
        let (mut tree, _, _, child) = setup();
        tree.set_rotation(child, Quat::from_rotation_z(0.8));
        tree.set_scale(child, Vec3::new(1.5, 0.5, 1.0));
        let rect = tree.rect(child).unwrap();
        let viewport = tree.viewport_transform(child).unwrap();
        let corners_before: Vec<Vec3> = [rect.min(), rect.max()]
            .iter()
            .map(|c| viewport.transform_point3(c.extend(0.0)))
            .collect();

        tree.set_pivot(child, Vec2::new(0.0, 0.0));
        let rect = tree.rect(child).unwrap();
        let viewport = tree.viewport_transform(child).unwrap();
        let corners_after: Vec<Vec3> = [rect.min(), rect.max()]
            .iter()
            .map(|c| viewport.transform_point3(c.extend(0.0)))
            .collect();

        for (a, b) in corners_before.iter().zip(&corners_after) {
            assert!(a.abs_diff_eq(*b, 1e-3), "{a} vs {b}");
        }
    }

    #[test]
    fn set_position_moves_pivot_and_depth() {
        let (mut tree, _, _, child) = setup();
        tree.set_position(child, Vec3::new(10.0, -20.0, 5.0));
        assert_eq!(tree.local_position(child), Some(Vec3::new(10.0, -20.0, 5.0)));
        assert_eq!(tree.world_position(child), Some(Vec3::new(410.0, 280.0, 5.0)));
        assert_eq!(tree.size(child), Some(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn unchanged_values_do_not_invalidate() {
        let (mut tree, _, _, child) = setup();
        tree.viewport_transform(child).unwrap();
        tree.set_scale(child, Vec3::ONE);
        tree.set_rotation(child, Quat::IDENTITY);
        tree.set_pivot(child, Vec2::splat(0.5));
        tree.set_anchor(child, Vec4::splat(0.5));
        assert!(tree.node(child).unwrap().dirty_flags().is_empty());
    }

    #[test]
    fn canvas_resize_invalidates_everything() {
        let (mut tree, canvas, root, child) = setup();
        tree.viewport_transform(child).unwrap();
        tree.set_target_canvas_size(canvas, Vec2::new(400.0, 300.0));
        assert_eq!(tree.node(root).unwrap().dirty_flags(), crate::DirtyFlags::all());
        assert_eq!(tree.node(child).unwrap().dirty_flags(), crate::DirtyFlags::all());
        assert_eq!(tree.world_position(child), Some(Vec3::new(200.0, 150.0, 0.0)));
    }

    #[test]
    fn design_resize_reflows_stretched_children() {
        let (mut tree, canvas, _, child) = setup();
        tree.set_anchor(child, Vec4::new(0.0, 0.0, 1.0, 1.0));
        tree.set_offset(child, Vec4::ZERO);
        tree.set_design_canvas_size(canvas, Vec2::new(400.0, 400.0));
        assert_eq!(tree.rect(child), Some(Rect::new(0.0, 0.0, 400.0, 400.0)));
    }
}
