//! Tree wiring errors.
//!
//! Layout inputs are corrected rather than rejected, so the only failures
//! surfaced to callers are structural: stale handles and invalid attachments.

use crate::node::NodeId;
use thiserror::Error;

/// Errors returned by tree wiring operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The handle does not refer to a live node.
    #[error("layout node {0:?} does not exist")]
    NodeNotFound(NodeId),
    /// Attaching would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Node being attached.
        child: NodeId,
        /// Requested parent.
        parent: NodeId,
    },
    /// Canvas roots always sit at the top of their tree.
    #[error("canvas root {0:?} cannot be attached under another node")]
    CanvasRootNotAttachable(NodeId),
}
