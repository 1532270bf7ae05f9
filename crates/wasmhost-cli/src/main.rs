//! wasmhost CLI - build-time AOT orchestration and dev-mode live reload

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use wasmhost_engine::DeploymentTarget;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "wasmhost")]
#[command(about = "Execution-mode selection and AOT packaging for WebAssembly modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Colored output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "wasmhost.toml")]
    pub config: PathBuf,

    /// Deployment target, overriding `[build].target`
    #[arg(short, long)]
    pub target: Option<DeploymentTarget>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile static modules ahead of time and write the package
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Package output directory (default: <output-dir>/package)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Parallel compilations (0 = one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Show how each module would run, without compiling anything
    Inspect {
        #[command(flatten)]
        project: ProjectArgs,

        /// Resolve as a development launch instead of a fixed deployment
        #[arg(long)]
        dev: bool,
    },

    /// Build once, then rebuild modules whenever their WASM file changes
    Dev {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "wasmhost=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let color = output::resolve_color_choice(cli.color.as_deref());

    match cli.command {
        Commands::Build { project, out, jobs } => {
            commands::build::execute(&project, out, jobs, color)
        }
        Commands::Inspect { project, dev } => commands::inspect::execute(&project, dev, color),
        Commands::Dev { project } => commands::dev::execute(&project, color),
    }
}
