use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Startup settings. Every field falls back to its default when absent from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub scene: PathBuf,
    pub environment: PathBuf,
    pub normal_map: PathBuf,
    pub window_size: [u32; 2],
    pub title: String,
    pub orbit_target: [f32; 3],
    pub clear_color: [f32; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scene: PathBuf::from("static/models/struct_scene_uncompressed.glb"),
            environment: PathBuf::from("static/textures/studio_small_01_4k.hdr"),
            normal_map: PathBuf::from("static/textures/normal.png"),
            window_size: [1280, 720],
            title: "Vitrine".to_string(),
            orbit_target: [0.0, 0.75, 0.0],
            clear_color: [0.0, 0.0, 0.0],
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: ViewerConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Reads the file named by the first argument, if any. Failures fall back to defaults.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Self {
        let Some(path) = args.nth(1) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(config) => {
                log::info!("Loaded config {}", path);
                config
            }
            Err(err) => {
                log::warn!("Ignoring config {}: {}", path, err);
                Self::default()
            }
        }
    }
}
