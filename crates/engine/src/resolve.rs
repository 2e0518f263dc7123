//! Lazy resolution of rects and matrices.
//!
//! Each getter resolves the parent's same quantity first, so a read after any
//! ancestor mutation always sees fresh state even if the ancestor itself was
//! never read in between. Dirty ancestor chains are walked with a loop, top
//! down, so tree depth is bounded by memory rather than the call stack.

use crate::dirty::DirtyFlags;
use crate::node::{LayoutNode, NodeId, WorldTransform};
use crate::tree::LayoutTree;
use glam::{Affine2, Mat2, Mat3, Mat4, Quat, Vec2, Vec3};
use rectlayout_core::{Rect, EPSILON};
use tracing::trace;

/// Counts of cache recomputations since the last reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStats {
    /// Rect recomputations.
    pub rect: u64,
    /// Local matrix recomputations.
    pub local: u64,
    /// Canvas-space matrix recomputations.
    pub canvas: u64,
    /// Viewport matrix recomputations.
    pub viewport: u64,
}

impl ResolveStats {
    /// Sum over all cache kinds.
    pub fn total(&self) -> u64 {
        self.rect + self.local + self.canvas + self.viewport
    }
}

impl LayoutTree {
    /// Resolved rect in canvas space (unrotated, unscaled).
    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.nodes.contains_key(id).then(|| self.resolve_rect(id))
    }

    /// Width and height of the resolved rect.
    pub fn size(&self, id: NodeId) -> Option<Vec2> {
        self.rect(id).map(|rect| rect.size())
    }

    /// Pivot point relative to the anchor reference point in the parent,
    /// with `pos_z` as depth.
    pub fn local_position(&self, id: NodeId) -> Option<Vec3> {
        let node = self.nodes.get(id)?;
        let rect = self.resolve_rect(id);
        let position = rect.point_at(node.pivot) - node.anchor_reference.get();
        Some(position.extend(node.pos_z))
    }

    /// Pivot-space rotate/scale matrix, expressed in canvas space.
    pub fn local_transform(&self, id: NodeId) -> Option<Mat4> {
        self.nodes
            .contains_key(id)
            .then(|| self.resolve_local(id))
    }

    /// Product of local matrices from the top of the tree down to `id`.
    pub fn canvas_space_transform(&self, id: NodeId) -> Option<Mat4> {
        self.nodes
            .contains_key(id)
            .then(|| self.resolve_canvas_space(id))
    }

    /// Canvas-space transform projected into the viewport.
    pub fn viewport_transform(&self, id: NodeId) -> Option<Mat4> {
        self.nodes
            .contains_key(id)
            .then(|| self.resolve_viewport(id))
    }

    /// Position, rotation and scale decomposed from the viewport matrix.
    pub fn world_transform(&self, id: NodeId) -> Option<WorldTransform> {
        let node = self.nodes.get(id)?;
        self.resolve_viewport(id);
        Some(node.world.get())
    }

    /// Viewport-space position of the pivot point.
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_transform(id).map(|world| world.position)
    }

    /// Accumulated rotation.
    pub fn world_rotation(&self, id: NodeId) -> Option<Quat> {
        self.world_transform(id).map(|world| world.rotation)
    }

    /// Accumulated scale, device scale included.
    pub fn world_scale(&self, id: NodeId) -> Option<Vec3> {
        self.world_transform(id).map(|world| world.scale)
    }

    /// Test a viewport-space point against the node's transformed rect.
    pub fn is_point_inside(&self, id: NodeId, point: Vec2) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        let viewport = self.resolve_viewport(id);
        viewport_contains(&viewport, &self.resolve_rect(id), point)
    }

    /// Recompute counters.
    pub fn stats(&self) -> ResolveStats {
        self.stats.get()
    }

    /// Zero the recompute counters.
    pub fn reset_stats(&self) {
        self.stats.set(ResolveStats::default());
    }

    pub(crate) fn resolve_rect(&self, id: NodeId) -> Rect {
        for current in self.dirty_chain(id, DirtyFlags::RECT) {
            self.refresh_rect(current);
        }
        self.nodes
            .get(id)
            .map(|node| node.rect.get())
            .unwrap_or(Rect::ZERO)
    }

    /// Recompute one rect; the parent rect must already be clean.
    fn refresh_rect(&self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let parent = self.parent_rect(node);
        let rect = Rect::resolve(&parent, &node.anchor, &node.offset);
        node.anchor_reference
            .set(Rect::anchor_reference(&parent, &node.anchor));
        node.rect.set(rect);
        node.clear(DirtyFlags::RECT);
        self.bump(|stats| stats.rect += 1);
        trace!(?id, ?rect, "resolved rect");
    }

    pub(crate) fn resolve_local(&self, id: NodeId) -> Mat4 {
        let Some(node) = self.nodes.get(id) else {
            return Mat4::IDENTITY;
        };
        if !node.is_dirty(DirtyFlags::LOCAL) {
            return node.local_matrix.get();
        }
        let local = if node.has_local_transform() {
            // Rotate and scale in viewport space so a non-uniform device
            // scale does not shear the node.
            let to_viewport = self.canvas_to_viewport(node);
            let to_canvas = self.viewport_to_canvas(node);
            let pivot = self.resolve_rect(id).point_at(node.pivot);
            let pivot = to_viewport.transform_point3(pivot.extend(0.0));
            to_canvas
                * Mat4::from_translation(pivot)
                * Mat4::from_scale_rotation_translation(node.scale, node.rotation, Vec3::ZERO)
                * Mat4::from_translation(-pivot)
                * to_viewport
        } else {
            Mat4::IDENTITY
        };
        node.local_matrix.set(local);
        node.clear(DirtyFlags::LOCAL);
        self.bump(|stats| stats.local += 1);
        local
    }

    pub(crate) fn resolve_canvas_space(&self, id: NodeId) -> Mat4 {
        for current in self.dirty_chain(id, DirtyFlags::CANVAS) {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            let local = self.resolve_local(current);
            let matrix = match node.parent.and_then(|parent| self.nodes.get(parent)) {
                Some(parent) => parent.canvas_matrix.get() * local,
                None => local,
            };
            node.canvas_matrix.set(matrix);
            node.clear(DirtyFlags::CANVAS);
            self.bump(|stats| stats.canvas += 1);
        }
        self.nodes
            .get(id)
            .map(|node| node.canvas_matrix.get())
            .unwrap_or(Mat4::IDENTITY)
    }

    pub(crate) fn resolve_viewport(&self, id: NodeId) -> Mat4 {
        let Some(node) = self.nodes.get(id) else {
            return Mat4::IDENTITY;
        };
        if !node.is_dirty(DirtyFlags::VIEWPORT) {
            return node.viewport_matrix.get();
        }
        let matrix = self.canvas_to_viewport(node) * self.resolve_canvas_space(id);
        let pivot = self.resolve_rect(id).point_at(node.pivot);
        let at_pivot = matrix * Mat4::from_translation(pivot.extend(node.pos_z));
        node.viewport_matrix.set(matrix);
        node.world.set(decompose(&at_pivot));
        node.clear(DirtyFlags::VIEWPORT);
        self.bump(|stats| stats.viewport += 1);
        trace!(?id, "resolved viewport transform");
        matrix
    }

    /// `id` and the ancestors above it that are dirty in `flag`, topmost
    /// first. A clean node implies clean ancestors, so the walk stops at the
    /// first clean one.
    fn dirty_chain(&self, id: NodeId, flag: DirtyFlags) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(current) else {
                break;
            };
            if !node.is_dirty(flag) {
                break;
            }
            chain.push(current);
            cursor = node.parent;
        }
        chain.reverse();
        chain
    }

    fn parent_rect(&self, node: &LayoutNode) -> Rect {
        match node.parent {
            Some(parent) => self.resolve_rect(parent),
            None => node
                .canvas
                .and_then(|canvas| self.canvases.get(canvas))
                .map(|canvas| canvas.design_rect())
                .unwrap_or(Rect::ZERO),
        }
    }

    fn canvas_to_viewport(&self, node: &LayoutNode) -> Mat4 {
        node.canvas
            .and_then(|canvas| self.canvases.get(canvas))
            .map(|canvas| canvas.canvas_to_viewport())
            .unwrap_or(Mat4::IDENTITY)
    }

    fn viewport_to_canvas(&self, node: &LayoutNode) -> Mat4 {
        node.canvas
            .and_then(|canvas| self.canvases.get(canvas))
            .map(|canvas| canvas.viewport_to_canvas())
            .unwrap_or(Mat4::IDENTITY)
    }

    fn bump(&self, update: impl FnOnce(&mut ResolveStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

/// Split a matrix into translation, per-axis scale and rotation.
///
/// Basis columns shorter than [`EPSILON`] are left un-normalized and
/// contribute the identity axis to the rotation, so a zero scale never
/// produces NaN.
pub fn decompose(matrix: &Mat4) -> WorldTransform {
    let position = matrix.w_axis.truncate();
    let columns = [
        matrix.x_axis.truncate(),
        matrix.y_axis.truncate(),
        matrix.z_axis.truncate(),
    ];
    let basis = [Vec3::X, Vec3::Y, Vec3::Z];

    let mut scale = Vec3::ZERO;
    let mut axes = basis;
    for axis in 0..3 {
        let length = columns[axis].length();
        scale[axis] = length;
        if length > EPSILON {
            axes[axis] = columns[axis] / length;
        }
    }

    // Mirrored bases carry the flip in the x scale.
    if Mat3::from_cols(axes[0], axes[1], axes[2]).determinant() < 0.0 {
        scale.x = -scale.x;
        axes[0] = -axes[0];
    }

    let rotation = Quat::from_mat3(&Mat3::from_cols(axes[0], axes[1], axes[2]));
    let rotation = if rotation.is_finite() && rotation.length_squared() > EPSILON {
        rotation.normalize()
    } else {
        Quat::IDENTITY
    };

    WorldTransform {
        position,
        rotation,
        scale,
    }
}

/// Map `point` back through the planar part of `viewport` and test it
/// against `rect`. Degenerate (non-invertible) transforms contain nothing.
pub(crate) fn viewport_contains(viewport: &Mat4, rect: &Rect, point: Vec2) -> bool {
    let planar = Affine2::from_mat2_translation(
        Mat2::from_cols(viewport.x_axis.truncate().truncate(), viewport.y_axis.truncate().truncate()),
        viewport.w_axis.truncate().truncate(),
    );
    if planar.matrix2.determinant().abs() <= EPSILON {
        return false;
    }
    rect.contains(planar.inverse().transform_point2(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, 1e-4)
    }

    fn tree_with_child() -> (LayoutTree, NodeId, NodeId) {
        let mut tree = LayoutTree::new();
        let (_, root) = tree.create_canvas(Vec2::new(800.0, 600.0), Vec2::new(800.0, 600.0));
        let child = tree.create_child(root).unwrap();
        (tree, root, child)
    }

    #[test]
    fn default_child_is_centered() {
        let (tree, root, child) = tree_with_child();
        assert_eq!(tree.rect(root), Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
        assert_eq!(tree.rect(child), Some(Rect::new(350.0, 250.0, 450.0, 350.0)));
        assert_eq!(tree.local_position(child), Some(Vec3::ZERO));
        assert_eq!(tree.world_position(child), Some(Vec3::new(400.0, 300.0, 0.0)));
    }

    #[test]
    fn second_read_hits_cache() {
        let (tree, _, child) = tree_with_child();
        let first = tree.rect(child).unwrap();
        let stats = tree.stats();
        let second = tree.rect(child).unwrap();
        let bits = |r: Rect| [r.left.to_bits(), r.top.to_bits(), r.right.to_bits(), r.bottom.to_bits()];
        assert_eq!(bits(first), bits(second));
        assert_eq!(tree.stats(), stats);

        tree.viewport_transform(child).unwrap();
        let stats = tree.stats();
        tree.viewport_transform(child).unwrap();
        tree.world_transform(child).unwrap();
        assert_eq!(tree.stats(), stats);
    }

    #[test]
    fn rotation_turns_around_pivot() {
        let (mut tree, _, child) = tree_with_child();
        tree.set_rotation(child, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let viewport = tree.viewport_transform(child).unwrap();

        let pivot = viewport.transform_point3(Vec3::new(400.0, 300.0, 0.0));
        assert!(approx(pivot, Vec3::new(400.0, 300.0, 0.0)));
        // Right-middle edge point swings to bottom-middle.
        let edge = viewport.transform_point3(Vec3::new(450.0, 300.0, 0.0));
        assert!(approx(edge, Vec3::new(400.0, 350.0, 0.0)));

        let rotation = tree.world_rotation(child).unwrap();
        assert!(rotation.abs_diff_eq(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2), 1e-4));
    }

    #[test]
    fn parent_scale_compounds_into_children() {
        let (mut tree, _, child) = tree_with_child();
        let grandchild = tree.create_child(child).unwrap();
        tree.set_scale(child, Vec3::new(2.0, 2.0, 1.0));
        tree.set_scale(grandchild, Vec3::new(1.5, 1.0, 1.0));

        assert!(approx(tree.world_scale(grandchild).unwrap(), Vec3::new(3.0, 2.0, 1.0)));
        // Grandchild is centered on the child, so the pivots coincide.
        assert!(approx(
            tree.world_position(grandchild).unwrap(),
            Vec3::new(400.0, 300.0, 0.0)
        ));
    }

    #[test]
    fn device_scale_applies_to_world_values() {
        let mut tree = LayoutTree::new();
        let (canvas, root) = tree.create_canvas(Vec2::new(800.0, 600.0), Vec2::new(1600.0, 1200.0));
        let child = tree.create_child(root).unwrap();
        assert_eq!(tree.world_position(child), Some(Vec3::new(800.0, 600.0, 0.0)));
        assert_eq!(tree.world_scale(child), Some(Vec3::new(2.0, 2.0, 1.0)));
        assert_eq!(tree.canvas(canvas).unwrap().device_scale(), Vec2::splat(2.0));
    }

    #[test]
    fn rotation_under_non_uniform_device_scale_does_not_shear() {
        let mut tree = LayoutTree::new();
        let (_, root) = tree.create_canvas(Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0));
        let child = tree.create_child(root).unwrap();
        tree.set_rotation(child, Quat::from_rotation_z(0.7));
        let viewport = tree.viewport_transform(child).unwrap();
        let x = viewport.x_axis.truncate();
        let y = viewport.y_axis.truncate();
        // In viewport space the canvas axes are scaled (2, 1) then rotated,
        // so they stay orthogonal.
        assert!(x.dot(y).abs() < 1e-3);
    }

    #[test]
    fn zero_scale_decomposes_without_nan() {
        let (mut tree, _, child) = tree_with_child();
        tree.set_scale(child, Vec3::new(0.0, 1.0, 1.0));
        let world = tree.world_transform(child).unwrap();
        assert!(world.position.is_finite());
        assert!(world.rotation.is_finite());
        assert_eq!(world.scale.x, 0.0);
        assert!(!tree.is_point_inside(child, Vec2::new(400.0, 300.0)));
    }

    #[test]
    fn point_inside_follows_rotation() {
        let (mut tree, _, child) = tree_with_child();
        tree.set_offset(child, Vec4::new(-100.0, -10.0, 100.0, 10.0));
        assert!(tree.is_point_inside(child, Vec2::new(480.0, 300.0)));
        assert!(!tree.is_point_inside(child, Vec2::new(400.0, 380.0)));

        tree.set_rotation(child, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        assert!(!tree.is_point_inside(child, Vec2::new(480.0, 300.0)));
        assert!(tree.is_point_inside(child, Vec2::new(400.0, 380.0)));
    }

    #[test]
    fn detached_node_resolves_against_zero_rect() {
        let mut tree = LayoutTree::new();
        let node = tree.create_node();
        assert_eq!(tree.rect(node), Some(Rect::new(-50.0, -50.0, 50.0, 50.0)));
        assert_eq!(tree.viewport_transform(node), Some(Mat4::IDENTITY));
        assert_eq!(tree.world_position(node), Some(Vec3::ZERO));
    }

    #[test]
    fn decompose_recovers_components() {
        let rotation = Quat::from_rotation_z(0.4);
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 1.0),
            rotation,
            Vec3::new(5.0, 6.0, 7.0),
        );
        let world = decompose(&matrix);
        assert!(approx(world.position, Vec3::new(5.0, 6.0, 7.0)));
        assert!(approx(world.scale, Vec3::new(2.0, 3.0, 1.0)));
        assert!(world.rotation.abs_diff_eq(rotation, 1e-4));
    }

    #[test]
    fn decompose_survives_zero_matrix() {
        let world = decompose(&Mat4::ZERO);
        assert_eq!(world.scale, Vec3::ZERO);
        assert_eq!(world.rotation, Quat::IDENTITY);
    }
}
