//! Artifact discovery after a compiler run
//!
//! Every module compiles into its own set of output roots, so a scan only
//! ever sees that module's files. Matches are sorted, which makes the
//! resulting artifact set independent of directory iteration order.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ArtifactKind, Error, Result};
use crate::module::QualifiedName;

/// File extensions of the generated artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ArtifactLayout {
    /// Host class files
    pub class_extension: String,
    /// Binary descriptor
    pub descriptor_extension: String,
    /// Source stub
    pub source_extension: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            class_extension: "hbc".to_string(),
            descriptor_extension: "meta".to_string(),
            source_extension: "rs".to_string(),
        }
    }
}

/// The three output roots handed to the compiler for one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRoots {
    /// Host class output
    pub classes: PathBuf,
    /// Binary descriptor output
    pub descriptor: PathBuf,
    /// Source stub output
    pub sources: PathBuf,
}

impl OutputRoots {
    /// Roots of module `key` under `output_dir`: `<output_dir>/wasmhost/<key>/...`
    pub fn for_module(output_dir: &Path, key: &str) -> Self {
        let base = output_dir.join("wasmhost").join(key);
        Self {
            classes: base.join("classes"),
            descriptor: base.join("wasm"),
            sources: base.join("generated-sources"),
        }
    }

    /// Remove anything a previous run left behind and recreate empty roots
    pub fn reset(&self) -> Result<()> {
        for root in [&self.classes, &self.descriptor, &self.sources] {
            if root.exists() {
                fs::remove_dir_all(root).map_err(|e| Error::io(root, e))?;
            }
            fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        }
        Ok(())
    }
}

/// Everything one successful compilation produced for a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifactSet {
    /// Module key
    pub key: String,
    /// Qualified module name
    pub name: QualifiedName,
    /// Generated host classes, sorted
    pub host_classes: BTreeSet<PathBuf>,
    /// The module's binary descriptor
    pub binary_descriptor: PathBuf,
    /// The module's source stub
    pub source_stub: PathBuf,
    /// Functions the compiler left to the interpreter
    pub interpreted_functions: BTreeSet<u32>,
}

/// Scan `roots` for the artifacts of module `name`
pub fn scan(
    key: &str,
    name: &QualifiedName,
    roots: &OutputRoots,
    layout: &ArtifactLayout,
    interpreted_functions: BTreeSet<u32>,
) -> Result<CompilationArtifactSet> {
    let class_pattern = format!(
        "{}*.{}",
        Pattern::escape(name.simple_name()),
        Pattern::escape(&layout.class_extension)
    );
    let host_classes = find_all(&roots.classes, &class_pattern)?;
    if host_classes.is_empty() {
        return Err(Error::ArtifactNotFound {
            name: name.to_string(),
            kind: ArtifactKind::HostClass,
            root: roots.classes.clone(),
        });
    }

    let binary_descriptor = find_one(
        name,
        ArtifactKind::Descriptor,
        &roots.descriptor,
        &layout.descriptor_extension,
    )?;
    let source_stub = find_one(
        name,
        ArtifactKind::SourceStub,
        &roots.sources,
        &layout.source_extension,
    )?;

    for class in &host_classes {
        debug!(key, path = %class.display(), "tracked host class");
    }
    debug!(key, path = %binary_descriptor.display(), "tracked binary descriptor");
    debug!(key, path = %source_stub.display(), "tracked source stub");

    Ok(CompilationArtifactSet {
        key: key.to_string(),
        name: name.clone(),
        host_classes: host_classes.into_iter().collect(),
        binary_descriptor,
        source_stub,
        interpreted_functions,
    })
}

fn find_one(
    name: &QualifiedName,
    kind: ArtifactKind,
    root: &Path,
    extension: &str,
) -> Result<PathBuf> {
    let mut found = find_all(root, &format!("*.{}", Pattern::escape(extension)))?;
    match found.len() {
        0 => Err(Error::ArtifactNotFound {
            name: name.to_string(),
            kind,
            root: root.to_path_buf(),
        }),
        1 => Ok(found.remove(0)),
        _ => Err(Error::DuplicateArtifact {
            name: name.to_string(),
            kind,
            found,
        }),
    }
}

/// Files under `root` (any depth) whose name matches `file_pattern`, sorted
fn find_all(root: &Path, file_pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/{}",
        Pattern::escape(&root.to_string_lossy()),
        file_pattern
    );
    let paths = glob::glob(&pattern).map_err(|e| {
        Error::io(
            root,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut found = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            Error::io(path, std::io::Error::from(e))
        })?;
        if path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
