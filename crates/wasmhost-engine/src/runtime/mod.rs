//! Run-time side: contexts, machine resolution and payload access
//!
//! A [`WasmRuntime`] owns the [`ContextStore`] and a [`MachineResolver`], and
//! hands out [`WasmContext`] handles. A handle pins the snapshot it was
//! created from, so everything obtained through one handle is consistent
//! even if the module is rebuilt meanwhile.

mod machines;
mod payload;
mod resolver;
mod store;

pub use machines::MachineRegistry;
pub use payload::load_payload;
pub use resolver::{MachineResolver, MachineStrategy, Provider};
pub use store::{ContextStore, ModuleSnapshot};

use std::sync::Arc;

use wasmhost_sdk::{InterpreterFactory, JitCompiler, MachineFactory, MachineLoader};

use crate::build::{ArtifactLayout, Package};
use crate::error::{Error, Result};
use crate::mode::{Deployment, ExecutionMode};
use crate::module::{ModuleRegistry, QualifiedName};
use crate::resources::ResourceLocator;

/// The external engine capabilities the runtime needs
#[derive(Clone)]
pub struct Engines {
    /// Run-time compiler
    pub jit: Arc<dyn JitCompiler>,
    /// Interpreter constructor
    pub interpreter: Arc<dyn InterpreterFactory>,
    /// Loader for packaged machine classes
    pub loader: Arc<dyn MachineLoader>,
}

/// Module contexts for one process
#[derive(Debug, Clone)]
pub struct WasmRuntime {
    deployment: Deployment,
    store: Arc<ContextStore>,
    resolver: MachineResolver,
    resources: ResourceLocator,
    layout: ArtifactLayout,
}

impl WasmRuntime {
    /// Assemble a runtime from its parts
    pub fn new(deployment: Deployment, store: Arc<ContextStore>, resolver: MachineResolver) -> Self {
        Self {
            deployment,
            store,
            resolver,
            resources: ResourceLocator::default(),
            layout: ArtifactLayout::default(),
        }
    }

    /// Start a runtime over a registry and the package built for it.
    ///
    /// Machine classes are loaded once, here; later rebuilds never add any.
    pub fn start(
        registry: &ModuleRegistry,
        deployment: Deployment,
        package: Arc<Package>,
        engines: Engines,
    ) -> Self {
        let machines = Arc::new(MachineRegistry::from_package(&package, engines.loader.as_ref()));
        let resolver = MachineResolver::new(
            Provider::for_deployment(&deployment),
            engines.jit,
            engines.interpreter,
            machines,
        );
        let store = Arc::new(ContextStore::new(registry, &deployment, package));
        Self::new(deployment, store, resolver)
    }

    /// Use a resource locator for `wasm-resource` payloads
    pub fn with_resources(mut self, resources: ResourceLocator) -> Self {
        self.resources = resources;
        self
    }

    /// Use a non-default artifact layout
    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Deployment this runtime serves
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Shared context store (the dev-mode reconciler swaps snapshots in it)
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Machine resolver
    pub fn resolver(&self) -> &MachineResolver {
        &self.resolver
    }

    /// Context handle for a module key
    pub fn context(&self, key: &str) -> Option<WasmContext> {
        let snapshot = self.store.get(key)?;
        Some(WasmContext {
            snapshot,
            runtime: self.clone(),
        })
    }

    /// Context handles for every module, in key order
    pub fn contexts(&self) -> Vec<WasmContext> {
        self.store
            .snapshots()
            .into_iter()
            .map(|snapshot| WasmContext {
                snapshot,
                runtime: self.clone(),
            })
            .collect()
    }
}

/// Handle to one module at one snapshot
#[derive(Debug, Clone)]
pub struct WasmContext {
    snapshot: Arc<ModuleSnapshot>,
    runtime: WasmRuntime,
}

impl WasmContext {
    /// Module key
    pub fn key(&self) -> &str {
        self.snapshot.context.key()
    }

    /// Qualified module name
    pub fn name(&self) -> &QualifiedName {
        self.snapshot.context.name()
    }

    /// Resolved execution mode
    pub fn execution_mode(&self) -> ExecutionMode {
        self.snapshot.context.resolved_mode()
    }

    /// Whether the payload is supplied at run time
    pub fn is_dynamic(&self) -> bool {
        self.snapshot.context.is_dynamic()
    }

    /// Snapshot generation this handle is pinned to
    pub fn generation(&self) -> u64 {
        self.snapshot.generation
    }

    /// Pinned snapshot
    pub fn snapshot(&self) -> &Arc<ModuleSnapshot> {
        &self.snapshot
    }

    /// Machine factory for instances of this module
    pub fn machine_factory(&self) -> MachineFactory<Error> {
        self.runtime.resolver.machine_factory(&self.snapshot.context)
    }

    /// Bytes to parse the module from; `None` for dynamic modules
    pub fn load_payload(&self) -> Result<Option<Vec<u8>>> {
        load_payload(
            &self.snapshot,
            &self.runtime.deployment,
            &self.runtime.resources,
            &self.runtime.layout,
        )
    }
}
