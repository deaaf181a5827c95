use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use super::{ShaderError, ShaderStage};

/// Pass-through vertex stage: position to clip space, color forwarded at location 0.
pub const DEFAULT_VERTEX_SOURCE: &str = include_str!("../../shaders/default.vert");

/// Pass-through fragment stage: writes the interpolated vertex color, opaque.
pub const DEFAULT_FRAGMENT_SOURCE: &str = include_str!("../../shaders/default.frag");

/// Name of the built-in shader pair.
pub const DEFAULT_SHADER_NAME: &str = "default";

/// Supplies shader source text by `(name, stage)`.
///
/// Lookup follows the `<name>.vert` / `<name>.frag` convention.
pub trait ShaderProvider {
    fn fetch(&self, name: &str, stage: ShaderStage) -> Result<String, ShaderError>;

    /// Path (or pseudo-path) a lookup resolves to, for diagnostics.
    fn locate(&self, name: &str, stage: ShaderStage) -> PathBuf;
}

// ── filesystem ────────────────────────────────────────────────────────────

/// Shader sources stored as files under one directory.
#[derive(Debug, Clone)]
pub struct ShaderDir {
    root: PathBuf,
}

impl ShaderDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShaderProvider for ShaderDir {
    fn fetch(&self, name: &str, stage: ShaderStage) -> Result<String, ShaderError> {
        let path = self.locate(name, stage);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ShaderError::Missing { stage, path })
            }
            Err(source) => Err(ShaderError::Unreadable { stage, path, source }),
        }
    }

    fn locate(&self, name: &str, stage: ShaderStage) -> PathBuf {
        self.root.join(format!("{name}.{}", stage.extension()))
    }
}

// ── in-memory ─────────────────────────────────────────────────────────────

/// Shader sources held in memory, keyed by `(name, stage)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShaders {
    sources: HashMap<(String, ShaderStage), String>,
}

impl InMemoryShaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider pre-loaded with the built-in `default` pair.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(DEFAULT_SHADER_NAME, ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .with(DEFAULT_SHADER_NAME, ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE)
    }

    pub fn with(mut self, name: &str, stage: ShaderStage, source: impl Into<String>) -> Self {
        self.insert(name, stage, source);
        self
    }

    pub fn insert(&mut self, name: &str, stage: ShaderStage, source: impl Into<String>) {
        self.sources.insert((name.to_string(), stage), source.into());
    }

    pub fn remove(&mut self, name: &str, stage: ShaderStage) -> Option<String> {
        self.sources.remove(&(name.to_string(), stage))
    }
}

impl ShaderProvider for InMemoryShaders {
    fn fetch(&self, name: &str, stage: ShaderStage) -> Result<String, ShaderError> {
        self.sources
            .get(&(name.to_string(), stage))
            .cloned()
            .ok_or_else(|| ShaderError::Missing {
                stage,
                path: self.locate(name, stage),
            })
    }

    fn locate(&self, name: &str, stage: ShaderStage) -> PathBuf {
        PathBuf::from(format!("<memory>/{name}.{}", stage.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_dir_reads_both_stages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.vert"), DEFAULT_VERTEX_SOURCE).unwrap();
        std::fs::write(dir.path().join("default.frag"), DEFAULT_FRAGMENT_SOURCE).unwrap();

        let shaders = ShaderDir::new(dir.path());
        assert_eq!(
            shaders.fetch("default", ShaderStage::Vertex).unwrap(),
            DEFAULT_VERTEX_SOURCE
        );
        assert_eq!(
            shaders.fetch("default", ShaderStage::Fragment).unwrap(),
            DEFAULT_FRAGMENT_SOURCE
        );
    }

    #[test]
    fn shader_dir_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.vert"), DEFAULT_VERTEX_SOURCE).unwrap();

        let shaders = ShaderDir::new(dir.path());
        let err = shaders.fetch("default", ShaderStage::Fragment).unwrap_err();
        match err {
            ShaderError::Missing { stage, path } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, dir.path().join("default.frag"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn in_memory_lookup_is_keyed_by_stage() {
        let mut shaders = InMemoryShaders::with_defaults();
        assert!(shaders.fetch("default", ShaderStage::Vertex).is_ok());

        shaders.remove("default", ShaderStage::Vertex);
        let err = shaders.fetch("default", ShaderStage::Vertex).unwrap_err();
        assert!(err.is_missing());
        assert!(shaders.fetch("default", ShaderStage::Fragment).is_ok());
        assert!(err.to_string().contains("default.vert"));
    }
}
