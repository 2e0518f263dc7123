#![warn(missing_docs)]
//! Shared fixtures, golden snapshots and metric sinks for layout tests.

mod metrics;
mod scenario;
mod snapshot;

use anyhow::Result;
use glam::{Vec2, Vec3, Vec4};
use rectlayout_engine::{CanvasId, LayoutTree, NodeId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use metrics::*;
pub use scenario::*;
pub use snapshot::*;

/// Canvas -> stretched panel -> centered button.
pub struct ThreeLevelTree {
    /// The tree.
    pub tree: LayoutTree,
    /// Its canvas (800x600 design and target).
    pub canvas: CanvasId,
    /// Canvas root node.
    pub root: NodeId,
    /// Stretched with a 20px margin: `(20, 20, 780, 580)`.
    pub panel: NodeId,
    /// Default 100x100 node centered in the panel.
    pub button: NodeId,
}

/// Build the [`ThreeLevelTree`] fixture.
pub fn three_level_tree() -> ThreeLevelTree {
    let mut tree = LayoutTree::new();
    let (canvas, root) = tree.create_canvas(Vec2::new(800.0, 600.0), Vec2::new(800.0, 600.0));
    let panel = tree
        .create_child(root)
        .expect("fixture root is live");
    tree.set_anchor(panel, Vec4::new(0.0, 0.0, 1.0, 1.0));
    tree.set_offset(panel, Vec4::new(20.0, 20.0, -20.0, -20.0));
    let button = tree
        .create_child(panel)
        .expect("fixture panel is live");
    ThreeLevelTree {
        tree,
        canvas,
        root,
        panel,
        button,
    }
}

/// A straight chain of `depth` default nodes under a fresh canvas root.
/// The returned handles start with the root.
pub fn nested_chain(design: Vec2, depth: usize) -> (LayoutTree, Vec<NodeId>) {
    let mut tree = LayoutTree::new();
    let (_, root) = tree.create_canvas(design, design);
    let mut ids = vec![root];
    for _ in 0..depth {
        let parent = ids[ids.len() - 1];
        ids.push(tree.create_child(parent).expect("chain parent is live"));
    }
    (tree, ids)
}

/// Resolved values of one node, rounded for stable goldens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Label given by the test.
    pub name: String,
    /// `[left, top, right, bottom]` in canvas space.
    pub rect: [f32; 4],
    /// Viewport-space pivot position.
    pub world_position: [f32; 3],
    /// Accumulated scale.
    pub world_scale: [f32; 3],
    /// Rotation about the view axis, in degrees.
    pub rotation_degrees: f32,
}

impl NodeRecord {
    /// Resolve `id` and record it; `None` for stale handles.
    pub fn capture(tree: &LayoutTree, name: &str, id: NodeId) -> Option<Self> {
        let rect = tree.rect(id)?;
        let world = tree.world_transform(id)?;
        let x_axis = world.rotation * Vec3::X;
        Some(Self {
            name: name.to_string(),
            rect: [rect.left, rect.top, rect.right, rect.bottom].map(round),
            world_position: world.position.to_array().map(round),
            world_scale: world.scale.to_array().map(round),
            rotation_degrees: round(x_axis.y.atan2(x_axis.x).to_degrees()),
        })
    }
}

/// Record every live handle in `watched`, skipping stale ones.
pub fn capture_records(tree: &LayoutTree, watched: &[(&str, NodeId)]) -> Vec<NodeRecord> {
    watched
        .iter()
        .filter_map(|&(name, id)| NodeRecord::capture(tree, name, id))
        .collect()
}

/// Two decimals, with negative zero folded into zero.
fn round(v: f32) -> f32 {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Writes resolved node records to JSON for CI artifacts.
pub struct LayoutMetricSink {
    file: File,
}

impl LayoutMetricSink {
    /// Create a sink pointed at the supplied path, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Persist the records as pretty JSON.
    pub fn write(&mut self, records: &[NodeRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        self.file.write_all(json.as_bytes())?;
        Ok(())
    }
}
