//! Immutable, thread-shareable copy of resolved layout.
//!
//! The tree itself keeps its caches in `Cell`s and is single-threaded. A
//! snapshot resolves everything up front and can then be handed to a render
//! or input thread.

use crate::node::{NodeId, WorldTransform};
use crate::resolve::viewport_contains;
use crate::tree::LayoutTree;
use glam::{Mat4, Vec2};
use rectlayout_core::Rect;
use std::collections::HashMap;

/// Resolved state of a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSnapshot {
    /// Handle in the source tree.
    pub id: NodeId,
    /// Parent handle in the source tree.
    pub parent: Option<NodeId>,
    /// Distance from the subtree root.
    pub depth: usize,
    /// Canvas-space rect.
    pub rect: Rect,
    /// Viewport matrix.
    pub viewport: Mat4,
    /// Decomposed world values.
    pub world: WorldTransform,
}

/// Pre-order list of resolved nodes.
#[derive(Debug, Clone, Default)]
pub struct LayoutSnapshot {
    nodes: Vec<NodeSnapshot>,
    index: HashMap<NodeId, usize>,
}

impl LayoutSnapshot {
    /// All nodes, parents before children, siblings in insertion order.
    pub fn nodes(&self) -> &[NodeSnapshot] {
        &self.nodes
    }

    /// Look up one node.
    pub fn get(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Topmost node containing `point`: the last match in draw order.
    pub fn hit_test(&self, point: Vec2) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|node| viewport_contains(&node.viewport, &node.rect, point))
            .map(|node| node.id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node was captured.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl LayoutTree {
    /// Resolve every node reachable from a root and copy the results out.
    pub fn snapshot(&self) -> LayoutSnapshot {
        let mut roots: Vec<NodeId> = self.roots().collect();
        // Canvas roots first so detached subtrees are drawn on top.
        roots.sort_by_key(|&id| self.canvas_of(id).is_none());

        let mut snapshot = LayoutSnapshot::default();
        for root in roots {
            let mut stack = vec![(root, 0usize)];
            while let Some((id, depth)) = stack.pop() {
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                let viewport = self.resolve_viewport(id);
                snapshot.index.insert(id, snapshot.nodes.len());
                snapshot.nodes.push(NodeSnapshot {
                    id,
                    parent: node.parent,
                    depth,
                    rect: self.resolve_rect(id),
                    viewport,
                    world: node.world.get(),
                });
                stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
            }
        }
        snapshot
    }
}
