//! Node arena and tree wiring.
//!
//! Nodes live in a [`SlotMap`]; parents hold their children's handles and
//! children refer back through a plain `Option<NodeId>`. Handles never keep a
//! node alive, so removing a subtree cannot leave a dangling back-reference:
//! stale handles simply stop resolving.

use crate::canvas::{CanvasId, CanvasRoot};
use crate::error::LayoutError;
use crate::node::{LayoutNode, NodeId};
use crate::resolve::ResolveStats;
use glam::Vec2;
use slotmap::SlotMap;
use std::cell::Cell;
use tracing::debug;

/// Arena holding every canvas and layout node.
#[derive(Debug, Default)]
pub struct LayoutTree {
    pub(crate) nodes: SlotMap<NodeId, LayoutNode>,
    pub(crate) canvases: SlotMap<CanvasId, CanvasRoot>,
    pub(crate) stats: Cell<ResolveStats>,
}

impl LayoutTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a canvas together with the root node that fills its design rect.
    pub fn create_canvas(&mut self, design_size: Vec2, target_size: Vec2) -> (CanvasId, NodeId) {
        let root = self.nodes.insert(LayoutNode::new());
        let canvas = self
            .canvases
            .insert(CanvasRoot::new(design_size, target_size, root));
        if let Some(node) = self.nodes.get_mut(root) {
            *node = LayoutNode::canvas_root(canvas);
        }
        debug!(?canvas, ?root, ?design_size, ?target_size, "created canvas");
        (canvas, root)
    }

    /// Create a detached node with default layout fields.
    pub fn create_node(&mut self) -> NodeId {
        self.nodes.insert(LayoutNode::new())
    }

    /// Create a node and attach it under `parent`.
    pub fn create_child(&mut self, parent: NodeId) -> Result<NodeId, LayoutError> {
        if !self.nodes.contains_key(parent) {
            return Err(LayoutError::NodeNotFound(parent));
        }
        let child = self.create_node();
        self.attach(child, parent)?;
        Ok(child)
    }

    /// Attach `child` as the last child of `parent`, detaching it from any
    /// previous parent first. The subtree adopts the parent's canvas and is
    /// fully invalidated.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), LayoutError> {
        if !self.nodes.contains_key(child) {
            return Err(LayoutError::NodeNotFound(child));
        }
        let Some(parent_node) = self.nodes.get(parent) else {
            return Err(LayoutError::NodeNotFound(parent));
        };
        if self.is_canvas_root(child) {
            return Err(LayoutError::CanvasRootNotAttachable(child));
        }
        // A leaf can only close a cycle by being attached to itself.
        let is_leaf = self.nodes.get(child).is_some_and(|node| node.children.is_empty());
        if child == parent || (!is_leaf && self.is_ancestor_or_self(child, parent)) {
            return Err(LayoutError::Cycle { child, parent });
        }
        let canvas = parent_node.canvas;

        self.unlink(child);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.bind_canvas(child, canvas);
        self.invalidate_subtree(child);
        Ok(())
    }

    /// Detach `id` from its parent. The subtree keeps its nodes but loses its
    /// canvas binding until attached again.
    pub fn detach(&mut self, id: NodeId) -> Result<(), LayoutError> {
        let Some(node) = self.nodes.get(id) else {
            return Err(LayoutError::NodeNotFound(id));
        };
        if node.parent.is_none() {
            return Ok(());
        }
        self.unlink(id);
        self.bind_canvas(id, None);
        self.invalidate_subtree(id);
        Ok(())
    }

    /// Remove `id` and all of its descendants. Destroying a canvas root also
    /// removes its canvas.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), LayoutError> {
        if !self.nodes.contains_key(id) {
            return Err(LayoutError::NodeNotFound(id));
        }
        self.unlink(id);
        let doomed = self.subtree(id);
        for &node in &doomed {
            self.nodes.remove(node);
        }
        self.canvases
            .retain(|_, canvas| !doomed.contains(&canvas.root()));
        debug!(?id, removed = doomed.len(), "destroyed subtree");
        Ok(())
    }

    /// True when `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Borrow a node's authored fields and cache state.
    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Children of `id`; empty for stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Canvas state by handle.
    pub fn canvas(&self, id: CanvasId) -> Option<&CanvasRoot> {
        self.canvases.get(id)
    }

    /// Canvas a node is bound to.
    pub fn canvas_of(&self, id: NodeId) -> Option<CanvasId> {
        self.nodes.get(id).and_then(|node| node.canvas)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without a parent: canvas roots and detached subtrees.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// `root` followed by its descendants in pre-order.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn is_canvas_root(&self, id: NodeId) -> bool {
        self.canvases.values().any(|canvas| canvas.root() == id)
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Remove the parent <-> child link, clearing the back-reference first.
    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&child| child != id);
        }
    }

    fn bind_canvas(&mut self, root: NodeId, canvas: Option<CanvasId>) {
        for id in self.subtree(root) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.canvas = canvas;
            }
        }
    }
}
