use anyhow::Result;
use rectlayout_engine::DEFAULT_DESIGN_SIZE;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SCENE_PATH: &str = "config/scene.toml";

/// Errors surfaced by [`SceneConfig::load_strict`].
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A layout scene: one canvas and a tree of nodes under its root.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    pub canvas: CanvasConfig,
    pub nodes: Vec<SceneNode>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Authored resolution.
    pub design: [f32; 2],
    /// Device resolution; the CLI can override it.
    pub target: [f32; 2],
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            design: DEFAULT_DESIGN_SIZE.to_array(),
            target: DEFAULT_DESIGN_SIZE.to_array(),
        }
    }
}

/// One authored node. Unset fields keep the engine defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneNode {
    pub name: String,
    /// `[left, top, right, bottom]` fractions of the parent rect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<[f32; 4]>,
    /// `[left, top, right, bottom]` distances from the anchored edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<[f32; 4]>,
    /// Applied after `offset`, on collapsed anchor axes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<[f32; 2]>,
    /// Pivot position relative to the anchor reference point, plus depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    pub rotation_degrees: f32,
    pub scale: [f32; 3],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            anchor: None,
            offset: None,
            size: None,
            pivot: None,
            position: None,
            rotation_degrees: 0.0,
            scale: [1.0, 1.0, 1.0],
            children: Vec::new(),
        }
    }
}

impl SceneConfig {
    /// Load a scene, falling back to an empty default scene on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match Self::load_strict(path) {
            Ok(scene) => scene,
            Err(SceneError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound
                    && path == Path::new(DEFAULT_SCENE_PATH) =>
            {
                warn!("Scene not found at {}. Using defaults", path.display());
                SceneConfig::default()
            }
            Err(err) => {
                warn!("{err}. Using defaults");
                SceneConfig::default()
            }
        }
    }

    /// Load a scene, returning read and parse errors to the caller.
    pub fn load_strict(path: &Path) -> Result<Self, SceneError> {
        let contents = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Save the scene to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Total number of authored nodes.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[SceneNode]) -> usize {
            nodes.iter().map(|node| 1 + count(&node.children)).sum()
        }
        count(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SCENE: &str = r#"
[canvas]
design = [800.0, 600.0]
target = [1600.0, 1200.0]

[[nodes]]
name = "panel"
anchor = [0.0, 0.0, 1.0, 1.0]
offset = [20.0, 20.0, -20.0, -20.0]

[[nodes.children]]
name = "button"
size = [200.0, 40.0]
rotation_degrees = 15.0
"#;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "rectlayout-{tag}-{}.toml",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn parses_nested_nodes_with_defaults() {
        let scene = SceneConfig::from_toml_str(SCENE).unwrap();
        assert_eq!(scene.canvas.target, [1600.0, 1200.0]);
        assert_eq!(scene.node_count(), 2);
        let button = &scene.nodes[0].children[0];
        assert_eq!(button.size, Some([200.0, 40.0]));
        assert_eq!(button.anchor, None);
        assert_eq!(button.scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let scene = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(scene.canvas.design, DEFAULT_DESIGN_SIZE.to_array());
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn lenient_load_survives_bad_files() {
        let path = temp_path("bad-scene");
        fs::write(&path, "nodes = 3").unwrap();
        assert!(matches!(
            SceneConfig::load_strict(&path),
            Err(SceneError::Parse { .. })
        ));
        let scene = SceneConfig::load_from_path(&path);
        assert!(scene.nodes.is_empty());
        fs::remove_file(&path).ok();

        assert!(matches!(
            SceneConfig::load_strict(&temp_path("missing")),
            Err(SceneError::Io { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_tree() {
        let path = temp_path("saved-scene");
        let scene = SceneConfig::from_toml_str(SCENE).unwrap();
        scene.save_to_path(&path).unwrap();
        let loaded = SceneConfig::load_strict(&path).unwrap();
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.nodes[0].children[0].rotation_degrees, 15.0);
        assert_eq!(loaded.nodes[0].offset, Some([20.0, 20.0, -20.0, -20.0]));
        fs::remove_file(&path).ok();
    }
}
