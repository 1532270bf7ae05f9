//! Packaged resource lookup
//!
//! Resources are addressed by slash-separated names relative to an ordered
//! list of roots; the first root containing the name wins.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Finds classpath-style resources under a list of roots
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
}

impl ResourceLocator {
    /// Create a locator over `roots`, searched in order
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Resolve configured roots against a project base directory
    pub fn from_base(base_dir: &Path, roots: &[PathBuf]) -> Self {
        Self::new(roots.iter().map(|r| base_dir.join(r)).collect())
    }

    /// Search roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First existing file for `name`.
    ///
    /// Names with `.`, `..` or root components never match, so a lookup
    /// cannot leave the roots.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name.trim().trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
    }

    /// Read the resource bytes
    pub fn read(&self, key: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.find(name).ok_or_else(|| not_found(key, name))?;
        std::fs::read(&path).map_err(|e| Error::io(path, e))
    }

    /// Copy the resource into a temporary file the caller keeps alive while it is needed
    pub fn materialize(&self, key: &str, name: &str) -> Result<NamedTempFile> {
        let bytes = self.read(key, name)?;
        let mut file = tempfile::Builder::new()
            .prefix("wasmhost-")
            .suffix(".wasm")
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        file.write_all(&bytes)
            .and_then(|_| file.flush())
            .map_err(|e| Error::io(file.path().to_path_buf(), e))?;
        debug!(key, resource = name, path = %file.path().display(), "resource materialized");
        Ok(file)
    }
}

fn not_found(key: &str, name: &str) -> Error {
    Error::ResourceNotFound {
        key: key.to_string(),
        resource: name.to_string(),
    }
}
