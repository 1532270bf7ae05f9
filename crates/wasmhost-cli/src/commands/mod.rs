//! Subcommand implementations and the project loading they share.

pub mod build;
pub mod dev;
pub mod inspect;

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wasmhost_engine::{
    BuildReport, CommandCompiler, Deployment, LaunchMode, ModuleRegistry, Orchestrator,
    SkippedModule, WasmConfig,
};

use crate::ProjectArgs;

/// A loaded configuration plus the deployment it is evaluated for
pub struct Project {
    pub config: WasmConfig,
    pub config_path: PathBuf,
    pub base_dir: PathBuf,
    pub deployment: Deployment,
}

impl Project {
    /// Load the configuration named by `args` for the given launch mode
    pub fn load(args: &ProjectArgs, launch_mode: LaunchMode) -> anyhow::Result<Self> {
        let config = WasmConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load {}", args.config.display()))?;
        let base_dir = match args.config.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let target = args.target.unwrap_or(config.build.target);

        Ok(Self {
            config,
            config_path: args.config.clone(),
            base_dir,
            deployment: Deployment::new(target, launch_mode),
        })
    }

    /// Accepted modules plus the ones rejected by their configuration
    pub fn registry(&self) -> (ModuleRegistry, Vec<SkippedModule>) {
        ModuleRegistry::from_config(&self.config, &self.base_dir, &self.deployment)
    }

    /// Orchestrator driving `[build].compiler`, or `None` when none is configured.
    pub fn orchestrator(&self, jobs: Option<usize>) -> Option<Orchestrator> {
        let compiler = CommandCompiler::from_command_line(&self.config.build.compiler)?;
        let orchestrator =
            Orchestrator::from_config(Arc::new(compiler), &self.config.build, &self.base_dir);
        Some(match jobs {
            Some(jobs) => orchestrator.with_jobs(jobs),
            None => orchestrator,
        })
    }

    /// Default package directory: `<output-dir>/package` under the base directory
    pub fn package_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.build.output_dir).join("package")
    }
}

/// Compile every static module of `registry`.
///
/// Without a configured compiler this only succeeds when there is nothing to
/// compile, in which case the report lists the dynamic modules alone.
pub fn compile_all(
    project: &Project,
    registry: &ModuleRegistry,
    orchestrator: Option<&Orchestrator>,
) -> anyhow::Result<BuildReport> {
    if let Some(orchestrator) = orchestrator {
        return orchestrator
            .orchestrate(registry)
            .context("Ahead-of-time compilation failed");
    }

    if let Some(module) = registry.iter().find(|m| !m.is_dynamic()) {
        bail!(
            "Module '{}' has a static payload but no compiler is configured; set [build].compiler in {}",
            module.key(),
            project.config_path.display()
        );
    }

    Ok(BuildReport {
        dynamic: registry.iter().map(|m| m.key().to_string()).collect(),
        ..BuildReport::default()
    })
}

/// Relative display of `path` under `base`, falling back to the full path
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmhost_engine::DeploymentTarget;

    fn write_config(dir: &Path, content: &str) -> ProjectArgs {
        let path = dir.join("wasmhost.toml");
        std::fs::write(&path, content).unwrap();
        ProjectArgs {
            config: path,
            target: None,
        }
    }

    #[test]
    fn test_load_uses_config_directory_as_base() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_config(dir.path(), "[modules.d]\nname = \"pkg.D\"\n");
        let project = Project::load(&args, LaunchMode::Normal).unwrap();
        assert_eq!(project.base_dir, dir.path());
        assert_eq!(project.package_dir(), dir.path().join("target").join("package"));
    }

    #[test]
    fn test_target_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = write_config(dir.path(), "[build]\ntarget = \"jit\"\n");
        args.target = Some(DeploymentTarget::Native);
        let project = Project::load(&args, LaunchMode::Development).unwrap();
        assert!(project.deployment.is_native_target());
        assert!(!project.deployment.is_fixed());
    }

    #[test]
    fn test_missing_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let args = ProjectArgs {
            config: dir.path().join("absent.toml"),
            target: None,
        };
        let err = Project::load(&args, LaunchMode::Normal).err().unwrap();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_dynamic_only_project_needs_no_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_config(dir.path(), "[modules.d]\nname = \"pkg.D\"\n");
        let project = Project::load(&args, LaunchMode::Normal).unwrap();
        let (registry, _) = project.registry();
        assert!(project.orchestrator(None).is_none());
        let report = compile_all(&project, &registry, None).unwrap();
        assert_eq!(report.dynamic, vec!["d".to_string()]);
        assert!(report.artifacts.is_empty());
    }

    #[test]
    fn test_static_module_without_compiler_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("add.wasm"), b"\0asm").unwrap();
        let args = write_config(
            dir.path(),
            "[modules.math]\nname = \"pkg.Add\"\nwasm-file = \"add.wasm\"\n",
        );
        let project = Project::load(&args, LaunchMode::Normal).unwrap();
        let (registry, _) = project.registry();
        let err = compile_all(&project, &registry, None).unwrap_err();
        assert!(err.to_string().contains("no compiler is configured"));
    }
}
