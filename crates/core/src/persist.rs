//! Persisted layout fields.
//!
//! Serializers store a flat struct per node. Missing keys fall back to the
//! same defaults a freshly created node uses, so older documents keep
//! loading without a version field.

use crate::edges::Edges;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Default width and height given to new nodes.
pub const DEFAULT_NODE_SIZE: Vec2 = Vec2::new(100.0, 100.0);

/// Default pivot (center of the node's own rect).
pub const DEFAULT_PIVOT: Vec2 = Vec2::new(0.5, 0.5);

/// Starting offset for a centered anchor holding a node of [`DEFAULT_NODE_SIZE`].
pub fn default_offset() -> Edges {
    Edges::new(
        -DEFAULT_NODE_SIZE.x * 0.5,
        -DEFAULT_NODE_SIZE.y * 0.5,
        DEFAULT_NODE_SIZE.x * 0.5,
        DEFAULT_NODE_SIZE.y * 0.5,
    )
}

/// Serializable snapshot of a node's authored layout fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectTransformData {
    /// Anchor as `[left, top, right, bottom]`.
    pub anchor: [f32; 4],
    /// Offset as `[left, top, right, bottom]`.
    pub offset: [f32; 4],
    /// Normalized pivot.
    pub pivot: [f32; 2],
    /// Depth used for the world position only.
    pub pos_z: f32,
    /// Size hint, applied only on axes whose anchor is collapsed.
    pub size: [f32; 2],
}

impl Default for RectTransformData {
    fn default() -> Self {
        Self {
            anchor: Edges::CENTER.to_array(),
            offset: default_offset().to_array(),
            pivot: DEFAULT_PIVOT.to_array(),
            pos_z: 0.0,
            size: DEFAULT_NODE_SIZE.to_array(),
        }
    }
}

impl RectTransformData {
    /// Anchor as [`Edges`].
    pub fn anchor(&self) -> Edges {
        Edges::from_array(self.anchor)
    }

    /// Offset as [`Edges`].
    pub fn offset(&self) -> Edges {
        Edges::from_array(self.offset)
    }

    /// Pivot as a vector.
    pub fn pivot(&self) -> Vec2 {
        Vec2::from_array(self.pivot)
    }

    /// Size hint as a vector.
    pub fn size(&self) -> Vec2 {
        Vec2::from_array(self.size)
    }
}
