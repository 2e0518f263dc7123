//! Per-tree canvas: authored design resolution, device target resolution and
//! the canvas -> viewport projection shared by every node under it.

use crate::node::NodeId;
use glam::{Mat4, Vec2, Vec3};
use rectlayout_core::{Rect, EPSILON};

slotmap::new_key_type! {
    /// Handle to a [`CanvasRoot`].
    pub struct CanvasId;
}

/// Design size used when a caller does not provide one.
pub const DEFAULT_DESIGN_SIZE: Vec2 = Vec2::new(960.0, 540.0);

/// Canvas state for one UI tree.
#[derive(Debug, Clone)]
pub struct CanvasRoot {
    design_size: Vec2,
    target_size: Vec2,
    device_scale: Vec2,
    canvas_to_viewport: Mat4,
    viewport_to_canvas: Mat4,
    root: NodeId,
}

impl CanvasRoot {
    pub(crate) fn new(design_size: Vec2, target_size: Vec2, root: NodeId) -> Self {
        let mut canvas = Self {
            design_size: sanitize_size(design_size),
            target_size: sanitize_size(target_size),
            device_scale: Vec2::ONE,
            canvas_to_viewport: Mat4::IDENTITY,
            viewport_to_canvas: Mat4::IDENTITY,
            root,
        };
        canvas.rebuild();
        canvas
    }

    /// Authored design resolution.
    pub fn design_size(&self) -> Vec2 {
        self.design_size
    }

    /// Device resolution the canvas is projected onto.
    pub fn target_size(&self) -> Vec2 {
        self.target_size
    }

    /// `target / design` per axis.
    pub fn device_scale(&self) -> Vec2 {
        self.device_scale
    }

    /// Projection from canvas space into viewport space.
    pub fn canvas_to_viewport(&self) -> Mat4 {
        self.canvas_to_viewport
    }

    /// Inverse of [`canvas_to_viewport`](Self::canvas_to_viewport).
    pub fn viewport_to_canvas(&self) -> Mat4 {
        self.viewport_to_canvas
    }

    /// The node filling the design rect.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// `(0, 0, design_w, design_h)`.
    pub fn design_rect(&self) -> Rect {
        Rect::from_size(self.design_size)
    }

    /// Returns `true` when the stored size changed.
    pub(crate) fn set_design_size(&mut self, size: Vec2) -> bool {
        let size = sanitize_size(size);
        if size == self.design_size {
            return false;
        }
        self.design_size = size;
        self.rebuild();
        true
    }

    /// Returns `true` when the stored size changed.
    pub(crate) fn set_target_size(&mut self, size: Vec2) -> bool {
        let size = sanitize_size(size);
        if size == self.target_size {
            return false;
        }
        self.target_size = size;
        self.rebuild();
        true
    }

    fn rebuild(&mut self) {
        let scale_axis = |target: f32, design: f32| {
            if design > EPSILON {
                target / design
            } else {
                1.0
            }
        };
        self.device_scale = Vec2::new(
            scale_axis(self.target_size.x, self.design_size.x),
            scale_axis(self.target_size.y, self.design_size.y),
        );

        // A zero target collapses the projection; its inverse maps everything
        // back onto the canvas origin instead of producing infinities.
        let inverse_axis = |s: f32| if s.abs() > EPSILON { 1.0 / s } else { 0.0 };
        self.canvas_to_viewport =
            Mat4::from_scale(Vec3::new(self.device_scale.x, self.device_scale.y, 1.0));
        self.viewport_to_canvas = Mat4::from_scale(Vec3::new(
            inverse_axis(self.device_scale.x),
            inverse_axis(self.device_scale.y),
            1.0,
        ));
    }
}

fn sanitize_size(size: Vec2) -> Vec2 {
    let axis = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Vec2::new(axis(size.x), axis(size.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn root() -> NodeId {
        NodeId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn device_scale_is_target_over_design() {
        let canvas = CanvasRoot::new(Vec2::new(800.0, 600.0), Vec2::new(1600.0, 300.0), root());
        assert_eq!(canvas.device_scale(), Vec2::new(2.0, 0.5));
        let p = canvas
            .canvas_to_viewport()
            .transform_point3(Vec3::new(10.0, 10.0, 4.0));
        assert_eq!(p, Vec3::new(20.0, 5.0, 4.0));
        let back = canvas.viewport_to_canvas().transform_point3(p);
        assert_eq!(back, Vec3::new(10.0, 10.0, 4.0));
    }

    #[test]
    fn zero_design_axis_falls_back_to_unit_scale() {
        let canvas = CanvasRoot::new(Vec2::new(0.0, 100.0), Vec2::new(50.0, 50.0), root());
        assert_eq!(canvas.device_scale(), Vec2::new(1.0, 0.5));
    }

    #[test]
    fn zero_target_keeps_inverse_finite() {
        let canvas = CanvasRoot::new(Vec2::new(100.0, 100.0), Vec2::ZERO, root());
        assert!(canvas.viewport_to_canvas().is_finite());
        assert_eq!(canvas.device_scale(), Vec2::ZERO);
    }

    #[test]
    fn setters_report_changes_and_sanitize() {
        let mut canvas = CanvasRoot::new(Vec2::new(100.0, 100.0), Vec2::new(100.0, 100.0), root());
        assert!(!canvas.set_target_size(Vec2::new(100.0, 100.0)));
        assert!(canvas.set_target_size(Vec2::new(200.0, f32::NAN)));
        assert_eq!(canvas.target_size(), Vec2::new(200.0, 0.0));
        assert!(canvas.set_design_size(Vec2::new(-5.0, 50.0)));
        assert_eq!(canvas.design_size(), Vec2::new(0.0, 50.0));
    }
}
