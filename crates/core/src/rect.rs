//! Axis-aligned rectangles in canvas space.
//!
//! Canvas space has its origin at the top-left of the design canvas with `y`
//! growing downwards, so `top <= bottom` for a well-formed rect.

use crate::edges::Edges;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box described by its four edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (minimum x).
    pub left: f32,
    /// Top edge (minimum y).
    pub top: f32,
    /// Right edge (maximum x).
    pub right: f32,
    /// Bottom edge (maximum y).
    pub bottom: f32,
}

impl Rect {
    /// Empty rect at the origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a rect from its edges.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rect spanning `(0, 0)` to `size`.
    pub fn from_size(size: Vec2) -> Self {
        Self::new(0.0, 0.0, size.x, size.y)
    }

    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Vertical extent.
    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Width and height as a vector.
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// Midpoint of the rect.
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    /// Top-left corner.
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    /// Bottom-right corner.
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right, self.bottom)
    }

    /// Point at normalized coordinates inside the rect (`(0,0)` is top-left,
    /// `(1,1)` bottom-right). Used to locate the pivot.
    pub fn point_at(&self, normalized: Vec2) -> Vec2 {
        Vec2::new(
            self.left + self.width() * normalized.x,
            self.top + self.height() * normalized.y,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Shift all edges by `delta`.
    pub fn translate(self, delta: Vec2) -> Self {
        Self::new(
            self.left + delta.x,
            self.top + delta.y,
            self.right + delta.x,
            self.bottom + delta.y,
        )
    }

    /// True when every edge is finite.
    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }

    /// True when `left <= right` and `top <= bottom`.
    pub fn is_ordered(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    /// Collapse any inverted edge pair onto its mutual center.
    pub fn normalized(self) -> Self {
        let mut rect = self;
        if rect.left > rect.right {
            let mid = (rect.left + rect.right) * 0.5;
            rect.left = mid;
            rect.right = mid;
        }
        if rect.top > rect.bottom {
            let mid = (rect.top + rect.bottom) * 0.5;
            rect.top = mid;
            rect.bottom = mid;
        }
        rect
    }

    /// Edge positions implied by `anchor` and `offset` inside `parent`,
    /// before inversion correction.
    pub fn anchored_edges(parent: &Rect, anchor: &Edges, offset: &Edges) -> Self {
        let width = parent.width();
        let height = parent.height();
        Self::new(
            parent.left + width * anchor.left + offset.left,
            parent.top + height * anchor.top + offset.top,
            parent.left + width * anchor.right + offset.right,
            parent.top + height * anchor.bottom + offset.bottom,
        )
    }

    /// Resolve a child rect against its parent. Inverted results collapse to
    /// their center so negative sizes never reach descendants.
    pub fn resolve(parent: &Rect, anchor: &Edges, offset: &Edges) -> Self {
        Self::anchored_edges(parent, anchor, offset).normalized()
    }

    /// Anchor reference point: the center of the anchor box inside `parent`.
    pub fn anchor_reference(parent: &Rect, anchor: &Edges) -> Vec2 {
        Vec2::new(
            parent.left + parent.width() * (anchor.left + anchor.right) * 0.5,
            parent.top + parent.height() * (anchor.top + anchor.bottom) * 0.5,
        )
    }
}
