//! Build a layout tree from a [`SceneConfig`] and report the resolved values.

use crate::config::{SceneConfig, SceneNode};
use anyhow::{Context, Result};
use glam::{Quat, Vec2, Vec3, Vec4};
use rectlayout_core::RectTransformData;
use rectlayout_engine::{CanvasId, LayoutTree, NodeId};
use serde::Serialize;
use std::fmt::Write as _;
use tracing::{debug, warn};

/// A resolved scene.
pub struct Scene {
    tree: LayoutTree,
    canvas: CanvasId,
    /// Authored nodes in pre-order with their depth below the canvas root.
    named: Vec<(String, NodeId, usize)>,
}

/// One row of the CLI report.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub name: String,
    pub depth: usize,
    pub rect: [f32; 4],
    pub world_position: [f32; 3],
    pub world_scale: [f32; 3],
    pub layout: RectTransformData,
}

impl Scene {
    pub fn build(config: &SceneConfig) -> Result<Self> {
        let mut tree = LayoutTree::new();
        let (canvas, root) = tree.create_canvas(
            Vec2::from_array(config.canvas.design),
            Vec2::from_array(config.canvas.target),
        );
        let mut scene = Self {
            tree,
            canvas,
            named: Vec::with_capacity(config.node_count()),
        };
        for node in &config.nodes {
            scene.add_node(root, node, 1)?;
        }
        debug!(nodes = scene.named.len(), "built scene");
        Ok(scene)
    }

    fn add_node(&mut self, parent: NodeId, node: &SceneNode, depth: usize) -> Result<()> {
        let id = self
            .tree
            .create_child(parent)
            .with_context(|| format!("Failed to attach scene node '{}'", node.name))?;
        if node.name.is_empty() {
            warn!(depth, "scene node without a name");
        }

        if let Some(anchor) = node.anchor {
            self.tree.set_anchor(id, Vec4::from_array(anchor));
        }
        if let Some(offset) = node.offset {
            self.tree.set_offset(id, Vec4::from_array(offset));
        }
        if let Some(size) = node.size {
            self.tree.set_size(id, Vec2::from_array(size));
        }
        if let Some(pivot) = node.pivot {
            self.tree.set_pivot(id, Vec2::from_array(pivot));
        }
        if let Some(position) = node.position {
            self.tree.set_position(id, Vec3::from_array(position));
        }
        if node.rotation_degrees != 0.0 {
            self.tree
                .set_rotation(id, Quat::from_rotation_z(node.rotation_degrees.to_radians()));
        }
        self.tree.set_scale(id, Vec3::from_array(node.scale));

        self.named.push((node.name.clone(), id, depth));
        for child in &node.children {
            self.add_node(id, child, depth + 1)?;
        }
        Ok(())
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    /// Override the device resolution.
    pub fn set_target(&mut self, size: Vec2) {
        self.tree.set_target_canvas_size(self.canvas, size);
    }

    /// Name of an authored node.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.named
            .iter()
            .find(|(_, node, _)| *node == id)
            .map(|(name, _, _)| name.as_str())
    }

    /// Topmost authored node under a viewport-space point.
    pub fn hit(&self, point: Vec2) -> Option<&str> {
        let snapshot = self.tree.snapshot();
        let id = snapshot.hit_test(point)?;
        self.name_of(id)
    }

    pub fn report(&self) -> Vec<NodeReport> {
        self.named
            .iter()
            .filter_map(|(name, id, depth)| {
                let rect = self.tree.rect(*id)?;
                let world = self.tree.world_transform(*id)?;
                Some(NodeReport {
                    name: name.clone(),
                    depth: *depth,
                    rect: [rect.left, rect.top, rect.right, rect.bottom],
                    world_position: world.position.to_array(),
                    world_scale: world.scale.to_array(),
                    layout: self.tree.capture(*id)?,
                })
            })
            .collect()
    }
}

pub fn render_table(rows: &[NodeReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>34} {:>26} {:>14}",
        "node", "rect (l, t, r, b)", "world position", "world scale"
    );
    for row in rows {
        let label = format!("{}{}", "  ".repeat(row.depth.saturating_sub(1)), row.name);
        let [l, t, r, b] = row.rect;
        let [x, y, z] = row.world_position;
        let [sx, sy, _] = row.world_scale;
        let _ = writeln!(
            out,
            "{label:<24} {:>34} {:>26} {:>14}",
            format!("({l:.1}, {t:.1}, {r:.1}, {b:.1})"),
            format!("({x:.1}, {y:.1}, {z:.1})"),
            format!("({sx:.2}, {sy:.2})"),
        );
    }
    out
}

pub fn render_json(rows: &[NodeReport]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("Failed to serialize layout report")
}
