//! Step-by-step layout scenarios checked against a golden file.
//!
//! A scenario starts from a prepared tree, applies a list of mutations one at
//! a time and records the resolved values of selected nodes after each one.
//! The first frame is captured before any mutation runs.

use crate::snapshot::assert_json_snapshot;
use crate::NodeRecord;
use anyhow::Result;
use rectlayout_engine::{LayoutTree, NodeId};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Named mutation applied between two frames.
pub type ScenarioStep<'a> = (&'a str, Box<dyn FnMut(&mut LayoutTree) + 'a>);

/// Box a mutation as a scenario step.
pub fn step<'a>(label: &'a str, apply: impl FnMut(&mut LayoutTree) + 'a) -> ScenarioStep<'a> {
    (label, Box::new(apply))
}

/// Configuration for a layout scenario.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Written into the report.
    pub name: String,
    /// Golden JSON file.
    pub snapshot_path: PathBuf,
}

/// Resolved state after one step.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioFrame {
    /// 0 for the initial frame.
    pub step: usize,
    /// Label of the mutation that produced this frame.
    pub label: String,
    /// Watched nodes, in the order they were registered.
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, Serialize)]
struct ScenarioReport {
    name: String,
    frames: Vec<ScenarioFrame>,
}

/// Run the steps against `tree` and compare every frame with the golden.
pub fn run_layout_scenario(
    config: ScenarioConfig,
    tree: &mut LayoutTree,
    watched: &[(&str, NodeId)],
    steps: Vec<ScenarioStep<'_>>,
) -> Result<()> {
    let frames = record_frames(tree, watched, steps);
    let report = ScenarioReport {
        name: config.name,
        frames,
    };
    assert_json_snapshot(config.snapshot_path, &report)
}

/// Apply `steps` and return one frame per step plus the initial frame.
pub fn record_frames(
    tree: &mut LayoutTree,
    watched: &[(&str, NodeId)],
    steps: Vec<ScenarioStep<'_>>,
) -> Vec<ScenarioFrame> {
    let mut frames = Vec::with_capacity(steps.len() + 1);
    frames.push(ScenarioFrame {
        step: 0,
        label: "initial".to_string(),
        nodes: crate::capture_records(tree, watched),
    });
    for (index, (label, mut apply)) in steps.into_iter().enumerate() {
        apply(tree);
        debug!(step = index + 1, label, nodes = tree.len(), "scenario step applied");
        frames.push(ScenarioFrame {
            step: index + 1,
            label: label.to_string(),
            nodes: crate::capture_records(tree, watched),
        });
    }
    frames
}
