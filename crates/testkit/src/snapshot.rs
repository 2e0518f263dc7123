//! Golden files for resolved layout.
//!
//! A golden is the pretty JSON of a serializable value, routed through
//! [`serde_json::Value`] whose object map keeps keys sorted. Struct field
//! order therefore never shows up in a diff; only changed numbers do.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable that switches [`assert_json_snapshot`] to
/// [`GoldenMode::Update`].
pub const UPDATE_SNAPSHOTS_ENV: &str = "RECTLAYOUT_UPDATE_SNAPSHOTS";

/// Whether a golden is checked or rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldenMode {
    /// Fail on any difference.
    Compare,
    /// Overwrite the golden with the current value.
    Update,
}

impl GoldenMode {
    /// `Update` when [`UPDATE_SNAPSHOTS_ENV`] is `1`, `true` or `yes`.
    pub fn from_env() -> Self {
        let flag = std::env::var(UPDATE_SNAPSHOTS_ENV).unwrap_or_default();
        match flag.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => GoldenMode::Update,
            _ => GoldenMode::Compare,
        }
    }
}

/// First line where a golden and the current output disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// 1-based line number.
    pub line: usize,
    /// Golden text on that line, trimmed.
    pub expected: String,
    /// Current text on that line, trimmed.
    pub actual: String,
}

/// Compare `value` with the golden at `path`, in the mode picked by the
/// environment.
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    check_golden(path.as_ref(), value, GoldenMode::from_env())
}

/// Compare with or rewrite the golden at `path`.
pub fn check_golden<T: Serialize>(path: &Path, value: &T, mode: GoldenMode) -> Result<()> {
    let actual = canonical_json(value)?;

    if mode == GoldenMode::Update {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create golden directory {}", dir.display()))?;
        }
        fs::write(path, &actual)
            .with_context(|| format!("Failed to write golden {}", path.display()))?;
        info!(path = %path.display(), "golden updated");
        return Ok(());
    }

    let expected = fs::read_to_string(path).with_context(|| {
        format!(
            "Golden missing at {} (set {}=1 to record it)",
            path.display(),
            UPDATE_SNAPSHOTS_ENV
        )
    })?;
    if let Some(diff) = first_difference(&expected, &actual) {
        warn!(path = %path.display(), line = diff.line, "golden mismatch");
        bail!(
            "Layout snapshot {} differs from golden at line {}: expected `{}`, got `{}` (set {}=1 to accept)",
            path.display(),
            diff.line,
            diff.expected,
            diff.actual,
            UPDATE_SNAPSHOTS_ENV
        );
    }
    Ok(())
}

/// Sorted-key pretty JSON with a trailing newline.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value).context("Failed to serialize golden value")?;
    let mut text = serde_json::to_string_pretty(&tree).context("Failed to format golden JSON")?;
    text.push('\n');
    Ok(text)
}

/// `None` when both texts have the same lines.
pub fn first_difference(expected: &str, actual: &str) -> Option<LineDiff> {
    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line = 1;
    loop {
        match (expected_lines.next(), actual_lines.next()) {
            (None, None) => return None,
            (e, a) if e == a => line += 1,
            (e, a) => {
                return Some(LineDiff {
                    line,
                    expected: e.unwrap_or("<end of file>").trim().to_string(),
                    actual: a.unwrap_or("<end of file>").trim().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "rectlayout-{tag}-{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn keys_are_sorted_recursively() {
        let text = canonical_json(&json!({"b": 1, "a": {"d": 2, "c": [{"z": 0, "y": 1}]}})).unwrap();
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let y = text.find("\"y\"").unwrap();
        let z = text.find("\"z\"").unwrap();
        assert!(a < b && y < z);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn update_records_then_compare_accepts_and_rejects() {
        let path = temp_path("golden");
        let value = json!({"rect": [0.0, 0.0, 10.0, 10.0]});
        check_golden(&path, &value, GoldenMode::Update).unwrap();
        check_golden(&path, &value, GoldenMode::Compare).unwrap();

        let moved = json!({"rect": [1.0, 0.0, 10.0, 10.0]});
        let err = check_golden(&path, &moved, GoldenMode::Compare).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("differs from golden at line 3"), "{message}");
        assert!(message.contains("expected `0.0,`, got `1.0,`"), "{message}");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_golden_is_an_error_in_compare_mode() {
        let err = check_golden(&temp_path("absent"), &json!([]), GoldenMode::Compare).unwrap_err();
        assert!(err.to_string().contains("Golden missing"));
    }

    #[test]
    fn first_difference_reports_truncation() {
        assert_eq!(first_difference("a\nb\n", "a\nb"), None);
        assert_eq!(
            first_difference("a\nb\nc", "a\nb"),
            Some(LineDiff {
                line: 3,
                expected: "c".into(),
                actual: "<end of file>".into(),
            })
        );
    }
}
