//! Module registry: every accepted module keyed by its configuration key

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::WasmConfig;
use crate::error::Error;
use crate::mode::Deployment;
use crate::module::ModuleDescriptor;

/// A module that was rejected while building the registry
#[derive(Debug)]
pub struct SkippedModule {
    /// Configuration key
    pub key: String,
    /// Why it was rejected
    pub error: Error,
}

/// Accepted modules, iterated in key order
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<ModuleDescriptor>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from a configuration document.
    ///
    /// Modules with unusable configuration are logged and returned in the
    /// skipped list instead of failing the whole build.
    pub fn from_config(
        config: &WasmConfig,
        base_dir: &Path,
        deployment: &Deployment,
    ) -> (Self, Vec<SkippedModule>) {
        let mut registry = Self::new();
        let mut skipped = Vec::new();

        for (key, module) in &config.modules {
            match ModuleDescriptor::from_config(key, module, base_dir, deployment) {
                Ok(descriptor) => {
                    info!(
                        key = key.as_str(),
                        name = %descriptor.name(),
                        payload = %descriptor.payload(),
                        "module accepted"
                    );
                    registry.insert(descriptor);
                }
                Err(error) => {
                    warn!(key = key.as_str(), %error, "module skipped");
                    skipped.push(SkippedModule {
                        key: key.clone(),
                        error,
                    });
                }
            }
        }

        (registry, skipped)
    }

    /// Insert or replace a descriptor
    pub fn insert(&mut self, descriptor: ModuleDescriptor) {
        self.modules
            .insert(descriptor.key().to_string(), Arc::new(descriptor));
    }

    /// Look up a module by key
    pub fn get(&self, key: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(key)
    }

    /// Modules in key order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> {
        self.modules.values()
    }

    /// Number of accepted modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module was accepted
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether any module reads its payload from the filesystem
    pub fn has_wasm_files(&self) -> bool {
        self.iter().any(|m| m.wasm_file().is_some())
    }

    /// `(key, path)` for every module with a filesystem payload
    pub fn watched_files(&self) -> Vec<(String, PathBuf)> {
        self.iter()
            .filter_map(|m| m.wasm_file().map(|p| (m.key().to_string(), p.to_path_buf())))
            .collect()
    }
}
