//! Dev-mode reconciliation
//!
//! Consumes [`ChangeEvent`]s one at a time. Every static module whose
//! `wasm-file` matches the changed path is recompiled and swapped into the
//! context store. The new package is the one the module was served from,
//! minus every entry the module registered last time, plus the fresh
//! registration. A failed rebuild is logged and the old snapshot stays.
//!
//! Only development and test launches can be reconciled: a fixed deployment
//! resolves ahead-of-time machines from classes loaded once at startup.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam::channel::Receiver;
use tracing::{error, info};

use crate::build::{registrar, Orchestrator, Package};
use crate::config::normalize_path;
use crate::error::{Error, Result};
use crate::mode::Deployment;
use crate::module::{ModuleDescriptor, ModuleRegistry};
use crate::runtime::{ContextStore, ModuleSnapshot};

/// A watched file changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path of the changed file
    pub path: PathBuf,
}

impl ChangeEvent {
    /// Create an event for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Outcome of reconciling one module
#[derive(Debug)]
pub struct Reconciled {
    /// Module key
    pub key: String,
    /// The snapshot now being served, or why the rebuild failed
    pub outcome: Result<Arc<ModuleSnapshot>>,
}

/// Rebuilds modules on file changes
pub struct Reconciler {
    registry: ModuleRegistry,
    orchestrator: Orchestrator,
    store: Arc<ContextStore>,
    deployment: Deployment,
}

impl Reconciler {
    /// Create a reconciler over the modules of `registry`.
    ///
    /// Fails with [`Error::FixedDeployment`] for a fixed launch.
    pub fn new(
        registry: ModuleRegistry,
        orchestrator: Orchestrator,
        store: Arc<ContextStore>,
        deployment: Deployment,
    ) -> Result<Self> {
        if deployment.is_fixed() {
            return Err(Error::FixedDeployment);
        }
        Ok(Self {
            registry,
            orchestrator,
            store,
            deployment,
        })
    }

    /// Modules whose payload file is `path`
    pub fn affected(&self, path: &std::path::Path) -> Vec<Arc<ModuleDescriptor>> {
        let path = normalize_path(path);
        self.registry
            .iter()
            .filter(|m| m.wasm_file() == Some(path.as_path()))
            .cloned()
            .collect()
    }

    /// Handle one change event
    pub fn reconcile(&self, event: &ChangeEvent) -> Vec<Reconciled> {
        self.affected(&event.path)
            .into_iter()
            .map(|module| {
                let key = module.key().to_string();
                info!(key = key.as_str(), path = %event.path.display(), "payload changed; rebuilding");
                let outcome = self
                    .store
                    .rebuild(&key, |previous| self.rebuild(&module, previous));
                if let Err(e) = &outcome {
                    error!(key = key.as_str(), error = %e, "rebuild failed; keeping previous artifacts");
                }
                Reconciled { key, outcome }
            })
            .collect()
    }

    /// Process events until every sender is dropped
    pub fn run(&self, events: Receiver<ChangeEvent>) {
        for event in events.iter() {
            self.reconcile(&event);
        }
        info!("change channel closed; reconciler stopped");
    }

    fn rebuild(
        &self,
        module: &Arc<ModuleDescriptor>,
        previous: &ModuleSnapshot,
    ) -> Result<ModuleSnapshot> {
        let artifacts = self.orchestrator.compile(module)?;
        let mut update = Package::new();
        registrar::register(&artifacts, &mut update)?;

        let mut package = (*previous.package).clone();
        package.remove_module(module.key());
        package.extend(update);
        Ok(ModuleSnapshot::new(
            Arc::clone(module),
            &self.deployment,
            Arc::new(package),
        ))
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("modules", &self.registry.len())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
