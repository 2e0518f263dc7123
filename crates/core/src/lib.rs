#![warn(missing_docs)]
//! Value types shared across the layout workspace: rects, anchor/offset
//! edges and the persisted per-node fields.

pub mod edges;
pub mod persist;
pub mod rect;

// Re-export commonly used types
pub use edges::{Anchor, Edges, Offset};
pub use persist::{default_offset, RectTransformData, DEFAULT_NODE_SIZE, DEFAULT_PIVOT};
pub use rect::Rect;

/// Tolerance used when comparing layout values against zero.
pub const EPSILON: f32 = 1e-6;
