//! Four-edge quantities: anchors (fractions of the parent rect) and offsets
//! (absolute margins added after the anchor is resolved).

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// Left/top/right/bottom quadruple.
///
/// Converts to and from [`Vec4`] as `(left, top, right, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Edges {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
}

/// Fractional box locating a node's edges inside its parent rect.
pub type Anchor = Edges;

/// Absolute per-edge margin applied after anchor resolution.
pub type Offset = Edges;

impl Edges {
    /// All edges zero.
    pub const ZERO: Self = Self::splat(0.0);

    /// Anchor collapsed onto the parent's center.
    pub const CENTER: Self = Self::splat(0.5);

    /// Anchor covering the whole parent.
    pub const STRETCH: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    /// Create from individual edges.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same value on every edge.
    pub const fn splat(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Build from `(left, top, right, bottom)`.
    pub fn from_vec4(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }

    /// Pack as `(left, top, right, bottom)`.
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.left, self.top, self.right, self.bottom)
    }

    /// Build from `[left, top, right, bottom]`.
    pub fn from_array(a: [f32; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }

    /// Pack as `[left, top, right, bottom]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    /// Clamp every edge into `[0, 1]`. NaN edges become 0.
    pub fn clamp01(self) -> Self {
        fn clamp(v: f32) -> f32 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        }
        Self::new(
            clamp(self.left),
            clamp(self.top),
            clamp(self.right),
            clamp(self.bottom),
        )
    }

    /// Shift both horizontal edges by `delta.x` and both vertical edges by
    /// `delta.y`.
    pub fn translate(self, delta: Vec2) -> Self {
        Self::new(
            self.left + delta.x,
            self.top + delta.y,
            self.right + delta.x,
            self.bottom + delta.y,
        )
    }

    /// `left == right`.
    #[inline]
    pub fn is_collapsed_x(&self) -> bool {
        self.left == self.right
    }

    /// `top == bottom`.
    #[inline]
    pub fn is_collapsed_y(&self) -> bool {
        self.top == self.bottom
    }

    /// Fix inverted pairs by pinning the edge that did not change relative to
    /// `previous` onto the edge that did. When both edges of a pair changed,
    /// they meet at their midpoint.
    pub fn pin_inverted(self, previous: &Edges) -> Self {
        let (left, right) = pin_pair(self.left, self.right, previous.left, previous.right);
        let (top, bottom) = pin_pair(self.top, self.bottom, previous.top, previous.bottom);
        Self::new(left, top, right, bottom)
    }
}

fn pin_pair(min: f32, max: f32, prev_min: f32, prev_max: f32) -> (f32, f32) {
    if min <= max {
        return (min, max);
    }
    match (min != prev_min, max != prev_max) {
        (true, false) => (min, min),
        (false, true) => (max, max),
        _ => {
            let mid = (min + max) * 0.5;
            (mid, mid)
        }
    }
}

impl From<Vec4> for Edges {
    fn from(v: Vec4) -> Self {
        Self::from_vec4(v)
    }
}

impl From<Edges> for Vec4 {
    fn from(e: Edges) -> Self {
        e.to_vec4()
    }
}
