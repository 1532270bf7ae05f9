//! Build-time compilation orchestration
//!
//! For each static module: locate the payload, reset the module's output
//! roots, run the three generator steps, then scan the roots into a
//! [`CompilationArtifactSet`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel;
use tracing::{info, warn};
use wasmhost_sdk::{AotCompiler, CompileRequest, EngineError};

use crate::build::package::Package;
use crate::build::registrar;
use crate::build::scan::{self, ArtifactLayout, CompilationArtifactSet, OutputRoots};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::module::{ModuleDescriptor, ModuleRegistry, PayloadSource, SkippedModule};
use crate::resources::ResourceLocator;

/// Outcome of one orchestration run
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Compiled modules, in key order
    pub artifacts: Vec<CompilationArtifactSet>,
    /// Modules skipped because of a module-local error, in key order
    pub skipped: Vec<SkippedModule>,
    /// Keys of dynamic modules (nothing to compile)
    pub dynamic: Vec<String>,
}

impl BuildReport {
    /// Register every compiled module into a fresh package
    pub fn package(&self, registry: &ModuleRegistry) -> Result<Package> {
        let mut package = Package::new();
        for artifacts in &self.artifacts {
            registrar::register(artifacts, &mut package)?;
        }
        registrar::register_payload_globs(registry, &mut package);
        Ok(package)
    }

    /// Artifact set of a module, if it was compiled
    pub fn artifacts_for(&self, key: &str) -> Option<&CompilationArtifactSet> {
        self.artifacts.iter().find(|a| a.key == key)
    }
}

/// Drives the external AOT compiler over the module registry
#[derive(Clone)]
pub struct Orchestrator {
    compiler: Arc<dyn AotCompiler>,
    output_dir: PathBuf,
    layout: ArtifactLayout,
    resources: ResourceLocator,
    jobs: usize,
}

impl Orchestrator {
    /// Create an orchestrator writing under `output_dir`, compiling sequentially
    pub fn new(compiler: Arc<dyn AotCompiler>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            compiler,
            output_dir: output_dir.into(),
            layout: ArtifactLayout::default(),
            resources: ResourceLocator::default(),
            jobs: 1,
        }
    }

    /// Create an orchestrator from the `[build]` table, resolving paths against `base_dir`
    pub fn from_config(compiler: Arc<dyn AotCompiler>, build: &BuildConfig, base_dir: &Path) -> Self {
        Self::new(compiler, base_dir.join(&build.output_dir))
            .with_layout(build.artifacts.clone())
            .with_resources(ResourceLocator::from_base(base_dir, &build.resource_roots))
            .with_jobs(build.jobs)
    }

    /// Use a different artifact layout
    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Use a different resource locator for `wasm-resource` payloads
    pub fn with_resources(mut self, resources: ResourceLocator) -> Self {
        self.resources = resources;
        self
    }

    /// Worker count (0 = one per CPU, 1 = sequential)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Build output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Artifact layout
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Resource locator
    pub fn resources(&self) -> &ResourceLocator {
        &self.resources
    }

    /// Compile one static module
    pub fn compile(&self, module: &ModuleDescriptor) -> Result<CompilationArtifactSet> {
        let key = module.key();
        let name = module.name();

        // Keeps a materialized resource alive until the generator is done with it
        let _materialized;
        let wasm_file: PathBuf = match module.payload() {
            PayloadSource::StaticFile(path) => {
                if !path.is_file() {
                    return Err(Error::ResourceNotFound {
                        key: key.to_string(),
                        resource: path.display().to_string(),
                    });
                }
                path.clone()
            }
            PayloadSource::StaticResource(resource) => {
                let file = self.resources.materialize(key, resource)?;
                let path = file.path().to_path_buf();
                _materialized = file;
                path
            }
            PayloadSource::Dynamic => {
                return Err(Error::configuration(key, "dynamic module has no payload to compile"));
            }
        };

        let roots = OutputRoots::for_module(&self.output_dir, key);
        roots.reset()?;

        let name_str = name.to_string();
        let preferences = module.preferences();
        let request = CompileRequest {
            wasm_file: &wasm_file,
            name: &name_str,
            class_output: &roots.classes,
            descriptor_output: &roots.descriptor,
            source_output: &roots.sources,
            interpreter_fallback: preferences.interpreter_fallback,
            interpreted_functions: &preferences.interpreted_functions,
        };

        info!(key, name = name_str.as_str(), compiler = self.compiler.name(), "compiling module");
        let compilation = |source: EngineError| Error::Compilation {
            name: name_str.clone(),
            source,
        };
        let interpreted = self.compiler.compile(&request).map_err(compilation)?;
        self.compiler
            .emit_descriptor(&request, &interpreted)
            .map_err(compilation)?;
        self.compiler
            .emit_source_stub(&request)
            .map_err(compilation)?;

        let artifacts = scan::scan(key, name, &roots, &self.layout, interpreted)?;
        info!(
            key,
            name = name_str.as_str(),
            classes = artifacts.host_classes.len(),
            interpreted = artifacts.interpreted_functions.len(),
            "module compiled"
        );
        Ok(artifacts)
    }

    /// Compile every static module of the registry.
    ///
    /// Module-local failures are recorded in the report; anything else aborts
    /// the run. The report does not depend on the worker count.
    pub fn orchestrate(&self, registry: &ModuleRegistry) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        let mut pending = Vec::new();
        for module in registry.iter() {
            if module.is_dynamic() {
                info!(key = module.key(), "dynamic module; nothing to compile");
                report.dynamic.push(module.key().to_string());
            } else {
                pending.push(Arc::clone(module));
            }
        }

        let workers = self.worker_count(pending.len());
        if workers <= 1 {
            for module in &pending {
                let result = self.compile(module);
                collect(&mut report, module.key(), result)?;
            }
        } else {
            for (key, result) in self.compile_parallel(pending, workers) {
                collect(&mut report, &key, result)?;
            }
        }
        Ok(report)
    }

    fn worker_count(&self, modules: usize) -> usize {
        let jobs = if self.jobs == 0 { num_cpus::get() } else { self.jobs };
        jobs.min(modules).max(1)
    }

    fn compile_parallel(
        &self,
        modules: Vec<Arc<ModuleDescriptor>>,
        workers: usize,
    ) -> Vec<(String, Result<CompilationArtifactSet>)> {
        let (job_tx, job_rx) = channel::unbounded::<Arc<ModuleDescriptor>>();
        let (result_tx, result_rx) = channel::unbounded();
        for module in modules {
            // The receiver is still held here, so sending cannot fail
            let _ = job_tx.send(module);
        }
        drop(job_tx);

        crossbeam::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move |_| {
                    for module in job_rx.iter() {
                        let result = self.compile(&module);
                        if result_tx.send((module.key().to_string(), result)).is_err() {
                            break;
                        }
                    }
                });
            }
        })
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        drop(result_tx);

        let mut results: Vec<_> = result_rx.iter().collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}

fn collect(
    report: &mut BuildReport,
    key: &str,
    result: Result<CompilationArtifactSet>,
) -> Result<()> {
    match result {
        Ok(artifacts) => report.artifacts.push(artifacts),
        Err(error) if error.is_module_local() => {
            warn!(key, %error, "module skipped");
            report.skipped.push(SkippedModule {
                key: key.to_string(),
                error,
            });
        }
        Err(error) => return Err(error),
    }
    Ok(())
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("compiler", &self.compiler.name())
            .field("output_dir", &self.output_dir)
            .field("layout", &self.layout)
            .field("jobs", &self.jobs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use wasmhost_sdk::EngineResult;

    struct Unused;

    impl AotCompiler for Unused {
        fn name(&self) -> &str {
            "unused"
        }

        fn compile(&self, _request: &CompileRequest<'_>) -> EngineResult<BTreeSet<u32>> {
            Err(EngineError::Compilation("not expected".into()))
        }

        fn emit_descriptor(
            &self,
            _request: &CompileRequest<'_>,
            _interpreted: &BTreeSet<u32>,
        ) -> EngineResult<()> {
            Ok(())
        }

        fn emit_source_stub(&self, _request: &CompileRequest<'_>) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_worker_count() {
        let orchestrator = Orchestrator::new(Arc::new(Unused), "/out");
        assert_eq!(orchestrator.worker_count(5), 1);
        let orchestrator = orchestrator.with_jobs(4);
        assert_eq!(orchestrator.worker_count(2), 2);
        assert_eq!(orchestrator.worker_count(0), 1);
        let orchestrator = orchestrator.with_jobs(0);
        assert!(orchestrator.worker_count(64) >= 1);
    }

    #[test]
    fn test_dynamic_module_cannot_be_compiled() {
        use crate::module::{CompilerPreferences, QualifiedName};
        let orchestrator = Orchestrator::new(Arc::new(Unused), "/out");
        let module = ModuleDescriptor::new(
            "dyn",
            QualifiedName::parse("pkg.Dyn").unwrap(),
            PayloadSource::Dynamic,
            CompilerPreferences::default(),
        );
        assert!(matches!(
            orchestrator.compile(&module),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_from_config_resolves_paths() {
        let build = BuildConfig::default();
        let orchestrator = Orchestrator::from_config(Arc::new(Unused), &build, Path::new("/p"));
        assert_eq!(orchestrator.output_dir(), Path::new("/p/target"));
        assert_eq!(orchestrator.resources().roots(), &[PathBuf::from("/p/resources")]);
    }
}
