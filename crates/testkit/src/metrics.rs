//! Metrics reports for CI artifacts.
//!
//! Tests that exercise the resolver export a JSON report so cache behavior
//! can be tracked across commits.

use anyhow::Result;
use rectlayout_engine::ResolveStats;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top-level report written to `metrics.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier
    pub test_name: String,

    /// Overall result
    pub result: TestResult,

    /// Cache recomputation counts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve: Option<ResolveMetrics>,

    /// Tree shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeMetrics>,

    /// Wall-clock timing
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Passed
    Pass,
    /// Failed
    Fail,
    /// Skipped
    Skip,
}

/// How often each cache was recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolveMetrics {
    /// Rect recomputations
    pub rect: u64,
    /// Local matrix recomputations
    pub local: u64,
    /// Canvas-space matrix recomputations
    pub canvas: u64,
    /// Viewport matrix recomputations
    pub viewport: u64,
}

impl From<ResolveStats> for ResolveMetrics {
    fn from(stats: ResolveStats) -> Self {
        Self {
            rect: stats.rect,
            local: stats.local,
            canvas: stats.canvas,
            viewport: stats.viewport,
        }
    }
}

/// Shape of the measured tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeMetrics {
    /// Live nodes
    pub nodes: usize,
    /// Deepest node depth below its root
    pub max_depth: usize,
    /// Mutations applied during the test
    pub mutations: usize,
}

/// Timing of the test body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Seconds spent in the measured section
    pub duration_seconds: f64,
    /// Assertions checked, when counted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,
}

/// Builder for [`MetricsReport`].
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Start a passing report with no sections.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                result: TestResult::Pass,
                resolve: None,
                tree: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set the result.
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Attach resolver counters.
    pub fn resolve(mut self, stats: impl Into<ResolveMetrics>) -> Self {
        self.report.resolve = Some(stats.into());
        self
    }

    /// Attach tree shape.
    pub fn tree(mut self, metrics: TreeMetrics) -> Self {
        self.report.tree = Some(metrics);
        self
    }

    /// Attach timing.
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Finish.
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Writes a [`MetricsReport`] as pretty JSON.
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    /// Create the sink, making parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Write (or overwrite) the report.
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
