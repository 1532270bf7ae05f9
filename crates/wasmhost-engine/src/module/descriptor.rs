//! Per-module descriptors built from configuration

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;
use wasmhost_sdk::InterpreterFallback;

use crate::config::ModuleConfig;
use crate::error::{Error, Result};
use crate::mode::{Deployment, ExecutionMode};
use crate::module::QualifiedName;

/// Where a module's WASM binary comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// Absolute, normalized filesystem path known at build time
    StaticFile(PathBuf),
    /// Packaged resource name known at build time
    StaticResource(String),
    /// Binary supplied only at run time
    Dynamic,
}

impl PayloadSource {
    /// Build the payload source from the two optional config fields.
    ///
    /// `wasm-file` wins over `wasm-resource` when both are set.
    pub fn from_config(key: &str, module: &ModuleConfig, base_dir: &Path) -> Self {
        if let Some(path) = module.wasm_file_absolute_path(base_dir) {
            if let Some(resource) = &module.wasm_resource {
                warn!(
                    key,
                    resource = resource.as_str(),
                    "both wasm-file and wasm-resource configured; using wasm-file"
                );
            }
            return PayloadSource::StaticFile(path);
        }
        match module.wasm_resource.as_deref().map(str::trim) {
            Some(resource) if !resource.is_empty() => {
                PayloadSource::StaticResource(resource.to_string())
            }
            _ => PayloadSource::Dynamic,
        }
    }

    /// Whether the binary is only known at run time
    pub fn is_dynamic(&self) -> bool {
        matches!(self, PayloadSource::Dynamic)
    }
}

impl fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadSource::StaticFile(path) => write!(f, "file {}", path.display()),
            PayloadSource::StaticResource(name) => write!(f, "resource {}", name),
            PayloadSource::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// Build-time compiler settings of one module
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompilerPreferences {
    /// Requested execution mode
    pub execution_mode: ExecutionMode,
    /// Policy for functions too large to compile
    pub interpreter_fallback: InterpreterFallback,
    /// Function indices forced to interpretation
    pub interpreted_functions: BTreeSet<u32>,
}

/// Identity and payload of one configured module. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    key: String,
    name: QualifiedName,
    payload: PayloadSource,
    preferences: CompilerPreferences,
}

impl ModuleDescriptor {
    /// Accept a module from configuration, checking mode legality for the deployment
    pub fn from_config(
        key: &str,
        module: &ModuleConfig,
        base_dir: &Path,
        deployment: &Deployment,
    ) -> Result<Self> {
        let name = QualifiedName::parse(&module.name)
            .map_err(|reason| Error::configuration(key, format!("invalid name: {}", reason)))?;
        let payload = PayloadSource::from_config(key, module, base_dir);
        let preferences = CompilerPreferences {
            execution_mode: module.compiler.execution_mode,
            interpreter_fallback: module.compiler.interpreter_fallback,
            interpreted_functions: module.interpreted_functions(),
        };

        match (payload.is_dynamic(), preferences.execution_mode) {
            (false, ExecutionMode::JitCompiled) if deployment.is_native_target() => {
                return Err(Error::configuration(
                    key,
                    "JitCompiled is not available on a native target",
                ));
            }
            (true, ExecutionMode::AheadOfTimeCompiled) => {
                return Err(Error::configuration(
                    key,
                    "AheadOfTimeCompiled requires wasm-file or wasm-resource",
                ));
            }
            _ => {}
        }

        Ok(Self {
            key: key.to_string(),
            name,
            payload,
            preferences,
        })
    }

    /// Assemble a descriptor directly, without legality checks
    pub fn new(
        key: impl Into<String>,
        name: QualifiedName,
        payload: PayloadSource,
        preferences: CompilerPreferences,
    ) -> Self {
        Self {
            key: key.into(),
            name,
            payload,
            preferences,
        }
    }

    /// Configuration key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Qualified module name
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Payload source
    pub fn payload(&self) -> &PayloadSource {
        &self.payload
    }

    /// Compiler preferences
    pub fn preferences(&self) -> &CompilerPreferences {
        &self.preferences
    }

    /// Whether the payload is only known at run time
    pub fn is_dynamic(&self) -> bool {
        self.payload.is_dynamic()
    }

    /// Filesystem payload, if any
    pub fn wasm_file(&self) -> Option<&Path> {
        match &self.payload {
            PayloadSource::StaticFile(path) => Some(path),
            _ => None,
        }
    }
}
