//! Engine error types.

use std::fmt;
use std::path::PathBuf;

use wasmhost_sdk::EngineError;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of artifact a post-compilation scan is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Host bytecode
    HostClass,
    /// Compact binary module descriptor
    Descriptor,
    /// Thin source stub
    SourceStub,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::HostClass => f.write_str("host class"),
            ArtifactKind::Descriptor => f.write_str("binary descriptor"),
            ArtifactKind::SourceStub => f.write_str("source stub"),
        }
    }
}

/// Errors raised while resolving, compiling, registering or instantiating modules.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Module configuration is unusable (module is skipped)
    #[error("Configuration error for module '{key}': {reason}")]
    Configuration {
        /// Module key
        key: String,
        /// What is wrong
        reason: String,
    },

    /// Declared WASM payload does not exist
    #[error("WASM payload '{resource}' for module '{key}' not found")]
    ResourceNotFound {
        /// Module key
        key: String,
        /// File path or resource name that was looked up
        resource: String,
    },

    /// External compiler (build time) or JIT (run time) failed
    #[error("Compilation of '{name}' failed: {source}")]
    Compilation {
        /// Qualified module name
        name: String,
        /// Engine-reported cause
        #[source]
        source: EngineError,
    },

    /// Post-compilation scan found no artifact of the expected kind
    #[error("No {kind} generated for '{name}' under {}", root.display())]
    ArtifactNotFound {
        /// Qualified module name
        name: String,
        /// What was expected
        kind: ArtifactKind,
        /// Root that was scanned
        root: PathBuf,
    },

    /// Post-compilation scan found more than one artifact where one is expected
    #[error("Expected one {kind} for '{name}', found {}: {}", found.len(), display_paths(found))]
    DuplicateArtifact {
        /// Qualified module name
        name: String,
        /// What was expected
        kind: ArtifactKind,
        /// Every match
        found: Vec<PathBuf>,
    },

    /// Ahead-of-time machine class is not registered
    #[error("Cannot load machine class: {class}")]
    MachineClassNotFound {
        /// Expected class name
        class: String,
    },

    /// Ahead-of-time machine class could not be instantiated
    #[error("Cannot construct machine '{class}': {source}")]
    MachineConstruction {
        /// Class name
        class: String,
        /// Engine-reported cause
        #[source]
        source: EngineError,
    },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Live reconciliation was requested for a fixed deployment
    #[error("Live rebuilds need a development or test launch, not a fixed deployment")]
    FixedDeployment,

    /// Packaged output is malformed or corrupted
    #[error("Package error: {0}")]
    Package(String),
}

impl Error {
    /// Whether the error only disqualifies the module it was raised for.
    ///
    /// Module-local errors are logged and the module is skipped; anything
    /// else aborts orchestration.
    pub fn is_module_local(&self) -> bool {
        matches!(self, Error::Configuration { .. } | Error::ResourceNotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn configuration(key: &str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_local_classification() {
        assert!(Error::configuration("math", "bad").is_module_local());
        assert!(Error::ResourceNotFound {
            key: "math".into(),
            resource: "add.wasm".into()
        }
        .is_module_local());
        assert!(!Error::ArtifactNotFound {
            name: "pkg.Add".into(),
            kind: ArtifactKind::Descriptor,
            root: PathBuf::from("/tmp"),
        }
        .is_module_local());
        assert!(!Error::Compilation {
            name: "pkg.Add".into(),
            source: EngineError::Compilation("boom".into()),
        }
        .is_module_local());
    }

    #[test]
    fn test_duplicate_artifact_message_lists_paths() {
        let err = Error::DuplicateArtifact {
            name: "pkg.Add".into(),
            kind: ArtifactKind::SourceStub,
            found: vec![PathBuf::from("a/Add.rs"), PathBuf::from("b/Add.rs")],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 2"));
        assert!(msg.contains("a/Add.rs, b/Add.rs"));
    }
}
