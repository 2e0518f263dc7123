#![warn(missing_docs)]
//! Anchor-based rect layout.
//!
//! A [`LayoutTree`] owns canvases and nodes. Nodes describe their box
//! relative to the parent with an anchor (fractions of the parent rect) and
//! an offset (absolute distances from the anchored edges), plus an optional
//! rotation/scale about a pivot. Derived values (rect, local, canvas-space
//! and viewport matrices) are cached per node and recomputed lazily when a
//! mutation marks them dirty.

pub mod canvas;
pub mod dirty;
pub mod error;
pub mod mutate;
pub mod node;
pub mod persist;
pub mod resolve;
pub mod snapshot;
pub mod tree;

pub use canvas::{CanvasId, CanvasRoot, DEFAULT_DESIGN_SIZE};
pub use dirty::{DirtyFlags, Recompute};
pub use error::LayoutError;
pub use node::{LayoutNode, NodeId, WorldTransform};
pub use resolve::{decompose, ResolveStats};
pub use snapshot::{LayoutSnapshot, NodeSnapshot};
pub use tree::LayoutTree;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
