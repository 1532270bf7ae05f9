//! Configuration parsing (wasmhost.toml)
//!
//! One `[modules.<key>]` table per WASM module plus an optional `[build]`
//! table describing the deployment target and output locations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use wasmhost_sdk::InterpreterFallback;

use crate::build::ArtifactLayout;
use crate::mode::{DeploymentTarget, ExecutionMode};

/// Errors that can occur while loading a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WasmConfig {
    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Configured modules by key
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

/// `[build]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Deployment target
    #[serde(default)]
    pub target: DeploymentTarget,

    /// Build output directory, relative to the project base directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Roots searched for `wasm-resource` payloads, in order
    #[serde(default = "default_resource_roots")]
    pub resource_roots: Vec<PathBuf>,

    /// Worker count for orchestration (0 = one per CPU, 1 = sequential)
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// External AOT compiler command line (program followed by fixed arguments)
    #[serde(default)]
    pub compiler: Vec<String>,

    /// Artifact file conventions
    #[serde(default)]
    pub artifacts: ArtifactLayout,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target")
}

fn default_resource_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("resources")]
}

fn default_jobs() -> usize {
    1
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target: DeploymentTarget::default(),
            output_dir: default_output_dir(),
            resource_roots: default_resource_roots(),
            jobs: default_jobs(),
            compiler: Vec::new(),
            artifacts: ArtifactLayout::default(),
        }
    }
}

/// `[modules.<key>]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleConfig {
    /// Static payload on the filesystem. Takes precedence over `wasm-resource`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_file: Option<String>,

    /// Static payload as a packaged resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_resource: Option<String>,

    /// Fully qualified module name (`pkg.Add`)
    pub name: String,

    /// Build-time compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// `[modules.<key>.compiler]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CompilerConfig {
    /// Preferred execution mode for static payloads
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Action when a function is too large to compile
    #[serde(default)]
    pub interpreter_fallback: InterpreterFallback,

    /// Function indices forced to interpretation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_functions: Option<Vec<u32>>,
}

impl WasmConfig {
    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: WasmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate document-level constraints.
    ///
    /// Module keys name output directories, so they must be plain path
    /// segments. Per-module legality is checked later by the registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, module) in &self.modules {
            if !is_valid_key(key) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid module key '{}'. Must contain only alphanumeric characters, hyphens and underscores",
                    key
                )));
            }
            if module.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Module '{}' has an empty name",
                    key
                )));
            }
        }

        if self.build.artifacts.class_extension.is_empty()
            || self.build.artifacts.descriptor_extension.is_empty()
            || self.build.artifacts.source_extension.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "Artifact extensions cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Write the configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl ModuleConfig {
    /// Absolute path of `wasm-file`, resolved against `base_dir` when relative
    pub fn wasm_file_absolute_path(&self, base_dir: &Path) -> Option<PathBuf> {
        let file = Path::new(self.wasm_file.as_deref()?);
        if file.is_absolute() {
            return Some(normalize_path(file));
        }
        Some(normalize_path(&absolute(base_dir).join(file)))
    }

    /// Forced-interpretation indices, deduplicated and ordered
    pub fn interpreted_functions(&self) -> std::collections::BTreeSet<u32> {
        self.compiler
            .interpreted_functions
            .iter()
            .flatten()
            .copied()
            .collect()
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the parent.
///
/// Does not touch the filesystem, so it works for paths that do not exist yet.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[build]
target = "native"
output-dir = "out"
jobs = 4

[modules.math]
name = "pkg.Add"
wasm-file = "add.wasm"

[modules.math.compiler]
execution-mode = "Interpreter"
interpreter-fallback = "FAIL"
interpreted-functions = [7, 3, 7]

[modules.dyn]
name = "pkg.Dynamic"
"#;

    #[test]
    fn test_parse_sample() {
        let config = WasmConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.build.target, DeploymentTarget::Native);
        assert_eq!(config.build.output_dir, PathBuf::from("out"));
        assert_eq!(config.build.jobs, 4);
        assert_eq!(config.modules.len(), 2);

        let math = &config.modules["math"];
        assert_eq!(math.name, "pkg.Add");
        assert_eq!(math.wasm_file.as_deref(), Some("add.wasm"));
        assert_eq!(math.compiler.interpreter_fallback, InterpreterFallback::Fail);
        let interpreted: Vec<u32> = math.interpreted_functions().into_iter().collect();
        assert_eq!(interpreted, vec![3, 7]);
    }

    #[test]
    fn test_defaults() {
        let config = WasmConfig::from_str("[modules.dyn]\nname = \"pkg.D\"\n").unwrap();
        assert_eq!(config.build.target, DeploymentTarget::Jit);
        assert_eq!(config.build.output_dir, PathBuf::from("target"));
        assert_eq!(config.build.jobs, 1);
        let module = &config.modules["dyn"];
        assert_eq!(module.compiler.execution_mode, ExecutionMode::Interpreter);
        assert_eq!(module.compiler.interpreter_fallback, InterpreterFallback::Warn);
        assert!(module.wasm_file.is_none());
        assert!(module.wasm_resource.is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = WasmConfig::from_str("[modules.x]\nname = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_missing_name_is_parse_error() {
        let err = WasmConfig::from_str("[modules.x]\nwasm-file = \"a.wasm\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_key_with_path_separator_rejected() {
        let err = WasmConfig::from_str("[modules.\"../x\"]\nname = \"pkg.X\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_relative_wasm_file_resolution() {
        let module = ModuleConfig {
            wasm_file: Some("wasm/../add.wasm".into()),
            wasm_resource: None,
            name: "pkg.Add".into(),
            compiler: CompilerConfig::default(),
        };
        let path = module.wasm_file_absolute_path(Path::new("/project")).unwrap();
        assert_eq!(path, PathBuf::from("/project/add.wasm"));
    }

    #[test]
    fn test_absolute_wasm_file_kept() {
        let module = ModuleConfig {
            wasm_file: Some("/opt/mods/add.wasm".into()),
            wasm_resource: None,
            name: "pkg.Add".into(),
            compiler: CompilerConfig::default(),
        };
        let path = module.wasm_file_absolute_path(Path::new("/project")).unwrap();
        assert_eq!(path, PathBuf::from("/opt/mods/add.wasm"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wasmhost.toml");
        let config = WasmConfig::from_str(SAMPLE).unwrap();
        config.to_file(&path).unwrap();
        let reloaded = WasmConfig::from_file(&path).unwrap();
        assert_eq!(config, reloaded);
    }
}
