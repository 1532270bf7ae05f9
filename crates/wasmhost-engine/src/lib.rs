//! wasmhost engine
//!
//! Decides how each configured WebAssembly module runs and produces what it
//! needs to run that way:
//! - **Configuration** (`config`): `wasmhost.toml` with one table per module
//! - **Registry** (`module`): accepted modules, their payload source and names
//! - **Selection** (`selector`, `context`): interpreter, JIT or AOT per module and target
//! - **Build** (`build`): drives the external AOT generator, scans and packages its output
//! - **Runtime** (`runtime`): context handles and machine factories at instantiation time
//! - **Dev mode** (`dev`): file watching and live rebuild of changed modules
//!
//! # Example
//!
//! ```rust,ignore
//! use wasmhost_engine::{Deployment, ModuleRegistry, Orchestrator, WasmConfig, WasmRuntime};
//!
//! let config = WasmConfig::from_file(Path::new("wasmhost.toml"))?;
//! let deployment = Deployment::default();
//! let (registry, _skipped) = ModuleRegistry::from_config(&config, base_dir, &deployment);
//!
//! let orchestrator = Orchestrator::from_config(generator, &config.build, base_dir);
//! let report = orchestrator.orchestrate(&registry)?;
//! let package = Arc::new(report.package(&registry)?);
//!
//! let runtime = WasmRuntime::start(&registry, deployment, package, engines);
//! let machine = runtime.context("math").unwrap().machine_factory()(&instance)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build;
pub mod config;
pub mod context;
pub mod dev;
pub mod error;
pub mod mode;
pub mod module;
pub mod resources;
pub mod runtime;
pub mod selector;

pub use build::{
    ArtifactLayout, BuildReport, CommandCompiler, CompilationArtifactSet, ModuleEntries,
    Orchestrator, OutputRoots, Package, Reflection,
};
pub use config::{BuildConfig, CompilerConfig, ConfigError, ModuleConfig, WasmConfig};
pub use context::{ExecutionContext, ModuleWarning};
pub use dev::{ChangeEvent, FileWatcher, Reconciled, Reconciler};
pub use error::{ArtifactKind, Error, Result};
pub use mode::{Deployment, DeploymentTarget, ExecutionMode, LaunchMode};
pub use module::{
    CompilerPreferences, ModuleDescriptor, ModuleRegistry, PayloadSource, QualifiedName,
    SkippedModule,
};
pub use resources::ResourceLocator;
pub use runtime::{
    ContextStore, Engines, MachineRegistry, MachineResolver, MachineStrategy, ModuleSnapshot,
    Provider, WasmContext, WasmRuntime,
};
pub use selector::{resolve, Resolution, SelectionWarning};
