//! Build-time pipeline
//!
//! ```text
//! ModuleRegistry ──► Orchestrator ──► CompilationArtifactSet ──► registrar ──► Package
//!                    (generator +                                 (classes,
//!                     artifact scan)                               resources)
//! ```

pub mod command;
pub mod orchestrator;
pub mod package;
pub mod registrar;
pub mod scan;

pub use command::CommandCompiler;
pub use orchestrator::{BuildReport, Orchestrator};
pub use package::{ClassEntry, ModuleEntries, Package, Reflection, MANIFEST_FILE};
pub use registrar::{register, register_payload_globs, WASM_FILE_GLOB};
pub use scan::{ArtifactLayout, CompilationArtifactSet, OutputRoots};
