//! `wasmhost build`: compile static modules and write the package.

use anyhow::Context;
use std::path::PathBuf;
use termcolor::ColorChoice;
use wasmhost_engine::{BuildReport, LaunchMode, ModuleRegistry, Package, SkippedModule};

use super::{compile_all, display_path, Project};
use crate::output::{Console, Style};
use crate::ProjectArgs;

pub fn execute(
    args: &ProjectArgs,
    out: Option<PathBuf>,
    jobs: Option<usize>,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let project = Project::load(args, LaunchMode::Normal)?;
    let (registry, rejected) = project.registry();
    let orchestrator = project.orchestrator(jobs);

    let report = compile_all(&project, &registry, orchestrator.as_ref())?;
    let package = report
        .package(&registry)
        .context("Failed to register compiled artifacts")?;

    let out_dir = out.unwrap_or_else(|| project.package_dir());
    package
        .write_to(&out_dir)
        .with_context(|| format!("Failed to write package to {}", out_dir.display()))?;

    let mut out = Console::new(color);
    print_summary(&mut out, &project, &registry, &report, &rejected, &package);
    out.styled(Style::Done, "Package written to ");
    out.text(&out_dir.display().to_string());
    out.end_line();
    Ok(())
}

fn print_summary(
    out: &mut Console,
    project: &Project,
    registry: &ModuleRegistry,
    report: &BuildReport,
    rejected: &[SkippedModule],
    package: &Package,
) {
    let heading = format!(
        "Built {} module(s) for target {}",
        registry.len(),
        project.deployment.target
    );
    out.styled(Style::Strong, &heading);
    out.end_line();

    for artifacts in &report.artifacts {
        out.styled(Style::Done, "  compiled ");
        out.text(&format!(
            "{} ({}): {} class(es), descriptor {}",
            artifacts.key,
            artifacts.name,
            artifacts.host_classes.len(),
            display_path(&artifacts.binary_descriptor, &project.base_dir),
        ));
        if !artifacts.interpreted_functions.is_empty() {
            let interpreted = artifacts.interpreted_functions.len();
            out.styled(Style::Faint, &format!(", {} function(s) interpreted", interpreted));
        }
        out.end_line();
    }

    for key in &report.dynamic {
        out.styled(Style::Note, "  dynamic  ");
        out.text(key);
        out.end_line();
    }

    for skipped in rejected.iter().chain(&report.skipped) {
        out.styled(Style::Warn, "  skipped  ");
        out.text(&format!("{}: {}", skipped.key, skipped.error));
        out.end_line();
    }

    let totals = format!(
        "{} class(es), {} resource(s)",
        package.classes().count(),
        package.resource_paths().count()
    );
    out.styled(Style::Faint, &totals);
    out.end_line();
}
