//! Shader source loading

use crate::{PostprocessError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Resolves a logical shader source name to its text
pub trait ShaderSourceLoader {
    /// Loads the source named `name`
    ///
    /// # Returns
    /// The source text, or [`PostprocessError::MissingShaderSource`] if no such source exists
    fn load(&self, name: &str) -> Result<String>;
}

/// Loads shader sources from files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShaderSourceLoader for DirectoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(PostprocessError::MissingShaderSource { name: name.to_string() }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Serves shader sources from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source, replacing any previous source of the same name
    pub fn with_source(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }
}

impl ShaderSourceLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        self.sources.get(name).cloned().ok_or_else(|| PostprocessError::MissingShaderSource { name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_source("shaders/pp/blur.fp", "void main() {}");
        assert_eq!(loader.load("shaders/pp/blur.fp").unwrap(), "void main() {}");
        assert!(matches!(
            loader.load("shaders/pp/missing.fp"),
            Err(PostprocessError::MissingShaderSource { ref name }) if name == "shaders/pp/missing.fp"
        ));
    }

    #[test]
    fn test_directory_loader() {
        let root = std::env::temp_dir().join(format!("postfx-loader-{}", std::process::id()));
        std::fs::create_dir_all(root.join("pp")).unwrap();
        std::fs::write(root.join("pp/tonemap.fp"), "out vec4 FragColor;").unwrap();

        let loader = DirectoryLoader::new(&root);
        assert_eq!(loader.load("pp/tonemap.fp").unwrap(), "out vec4 FragColor;");
        assert!(matches!(loader.load("pp/lens.fp"), Err(PostprocessError::MissingShaderSource { .. })));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
