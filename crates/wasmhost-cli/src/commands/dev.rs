//! `wasmhost dev`: initial build, then live rebuilds on payload changes.

use anyhow::Context;
use crossbeam::channel::unbounded;
use std::sync::Arc;
use termcolor::ColorChoice;
use tracing::info;
use wasmhost_engine::{ContextStore, FileWatcher, LaunchMode, Reconciled, Reconciler};

use super::{compile_all, Project};
use crate::output::{Console, Style};
use crate::ProjectArgs;

pub fn execute(args: &ProjectArgs, color: ColorChoice) -> anyhow::Result<()> {
    let project = Project::load(args, LaunchMode::Development)?;
    let (registry, _) = project.registry();
    let orchestrator = project.orchestrator(None);

    let report = compile_all(&project, &registry, orchestrator.as_ref())?;
    let package = report
        .package(&registry)
        .context("Failed to register compiled artifacts")?;
    let store = Arc::new(ContextStore::new(
        &registry,
        &project.deployment,
        Arc::new(package),
    ));

    let mut out = Console::new(color);
    let files: Vec<_> = registry
        .watched_files()
        .into_iter()
        .map(|(_, path)| path)
        .collect();
    if files.is_empty() {
        out.styled(Style::Warn, "No modules with a wasm-file; nothing to watch");
        out.end_line();
        return Ok(());
    }

    let orchestrator = orchestrator.context("No compiler configured")?;
    let (sender, receiver) = unbounded();
    let watcher = FileWatcher::spawn(files, sender).context("Failed to start file watcher")?;
    for path in watcher.files() {
        out.styled(Style::Note, "watching ");
        out.text(&path.display().to_string());
        out.end_line();
    }

    let reconciler = Reconciler::new(registry, orchestrator, store, project.deployment)
        .context("Failed to start reconciler")?;
    info!(modules = watcher.files().count(), "dev mode started");
    for event in receiver.iter() {
        for reconciled in reconciler.reconcile(&event) {
            report_swap(&mut out, &reconciled);
        }
    }
    Ok(())
}

fn report_swap(out: &mut Console, reconciled: &Reconciled) {
    match &reconciled.outcome {
        Ok(snapshot) => {
            out.styled(Style::Done, "reloaded ");
            out.text(&format!(
                "{} (generation {}, {})",
                reconciled.key,
                snapshot.generation,
                snapshot.context.resolved_mode()
            ));
            out.end_line();
        }
        Err(e) => {
            out.error_line(&format!("rebuild of {} failed: {}", reconciled.key, e));
        }
    }
}
