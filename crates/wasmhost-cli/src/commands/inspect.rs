//! `wasmhost inspect`: show how each module resolves, without compiling.

use termcolor::ColorChoice;
use wasmhost_engine::{ExecutionContext, LaunchMode, ModuleDescriptor, PayloadSource};

use super::Project;
use crate::output::{Console, Style};
use crate::ProjectArgs;

pub fn execute(args: &ProjectArgs, dev: bool, color: ColorChoice) -> anyhow::Result<()> {
    let launch_mode = if dev {
        LaunchMode::Development
    } else {
        LaunchMode::Normal
    };
    let project = Project::load(args, launch_mode)?;
    let (registry, rejected) = project.registry();
    let mut out = Console::new(color);

    for module in registry.iter() {
        let (context, warning) = ExecutionContext::derive(module, &project.deployment);
        out.styled(Style::Strong, module.key());
        out.text(&format!(
            "  {}  {}  {}",
            module.name(),
            payload_kind(module),
            context.resolved_mode()
        ));
        if let Some(warning) = warning {
            out.styled(Style::Warn, &format!("  warning: {}", warning.warning));
        }
        out.end_line();
    }

    for skipped in &rejected {
        out.styled(Style::Strong, &skipped.key);
        out.styled(Style::Fail, "  rejected: ");
        out.text(&skipped.error.to_string());
        out.end_line();
    }

    Ok(())
}

fn payload_kind(module: &ModuleDescriptor) -> &'static str {
    match module.payload() {
        PayloadSource::StaticFile(_) => "file",
        PayloadSource::StaticResource(_) => "resource",
        PayloadSource::Dynamic => "dynamic",
    }
}
