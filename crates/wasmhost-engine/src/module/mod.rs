//! Configured modules
//!
//! - [`QualifiedName`]: dotted module name and derived artifact names
//! - [`ModuleDescriptor`]: accepted identity, payload and compiler preferences
//! - [`ModuleRegistry`]: every accepted module, keyed by configuration key

mod descriptor;
mod name;
mod registry;

pub use descriptor::{CompilerPreferences, ModuleDescriptor, PayloadSource};
pub use name::{QualifiedName, MACHINE_SUFFIX};
pub use registry::{ModuleRegistry, SkippedModule};
