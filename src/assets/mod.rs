mod scene_import;
#[cfg(test)]
pub(crate) mod test_support;
pub mod texture;

pub use scene_import::{import_scene, LoadedScene};
pub use texture::{Texels, Texture, TextureError};

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read glTF at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode glTF at {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("{path} requires unsupported extension {extension}")]
    UnsupportedExtension {
        path: String,
        extension: &'static str,
    },
    #[error("glTF document has no scene")]
    NoScene,
}

/// Starts asset decodes on background threads and reports each outcome exactly once
/// through the supplied completion callback.
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    root: Option<PathBuf>,
}

impl AssetLoader {
    /// Relative paths are resolved against the crate directory.
    pub fn new() -> Self {
        Self {
            root: Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
        }
    }

    /// Relative paths are resolved against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn load_scene<F>(&self, path: &Path, on_complete: F) -> std::io::Result<()>
    where
        F: FnOnce(Result<LoadedScene, AssetError>) + Send + 'static,
    {
        let path = self.resolve(path);
        log::info!("Loading scene {}", path.display());
        spawn_job("scene-loader", move || on_complete(import_scene(&path)))
    }

    pub fn load_environment<F>(&self, path: &Path, on_complete: F) -> std::io::Result<()>
    where
        F: FnOnce(Result<Texture, TextureError>) + Send + 'static,
    {
        let path = self.resolve(path);
        log::info!("Loading environment {}", path.display());
        spawn_job("environment-loader", move || {
            on_complete(texture::load_environment(&path))
        })
    }

    pub fn load_normal_map<F>(&self, path: &Path, on_complete: F) -> std::io::Result<()>
    where
        F: FnOnce(Result<Texture, TextureError>) + Send + 'static,
    {
        let path = self.resolve(path);
        log::info!("Loading normal map {}", path.display());
        spawn_job("normal-map-loader", move || {
            on_complete(texture::load_rgba8(&path))
        })
    }
}

fn spawn_job(name: &str, job: impl FnOnce() + Send + 'static) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(job)
        .map(|_| ())
}
