//! Per-module execution contexts

use tracing::{info, warn};

use crate::mode::{Deployment, ExecutionMode};
use crate::module::{ModuleDescriptor, QualifiedName};
use crate::selector::{self, SelectionWarning};

/// A selection warning attributed to a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleWarning {
    /// Module key
    pub key: String,
    /// What was degraded
    pub warning: SelectionWarning,
}

/// Resolved execution settings of one module for one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    key: String,
    name: QualifiedName,
    resolved_mode: ExecutionMode,
    is_dynamic: bool,
    is_native_target: bool,
}

impl ExecutionContext {
    /// Derive the context of a module and log the outcome.
    ///
    /// Returns the warning too, so callers can report it without scraping logs.
    pub fn derive(
        descriptor: &ModuleDescriptor,
        deployment: &Deployment,
    ) -> (Self, Option<ModuleWarning>) {
        let is_dynamic = descriptor.is_dynamic();
        let is_native_target = deployment.is_native_target();
        let resolution = selector::resolve(
            is_dynamic,
            is_native_target,
            descriptor.preferences().execution_mode,
        );

        let warning = resolution.warning.map(|warning| {
            warn!(key = descriptor.key(), "{}", warning);
            ModuleWarning {
                key: descriptor.key().to_string(),
                warning,
            }
        });
        if is_dynamic && !is_native_target {
            info!(key = descriptor.key(), "no payload configured; using the runtime compiler");
        }

        let context = Self {
            key: descriptor.key().to_string(),
            name: descriptor.name().clone(),
            resolved_mode: resolution.mode,
            is_dynamic,
            is_native_target,
        };
        (context, warning)
    }

    /// Module key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Qualified module name
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Resolved execution mode
    pub fn resolved_mode(&self) -> ExecutionMode {
        self.resolved_mode
    }

    /// Whether the payload is supplied at run time
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Whether the deployment target forbids run-time code generation
    pub fn is_native_target(&self) -> bool {
        self.is_native_target
    }
}
