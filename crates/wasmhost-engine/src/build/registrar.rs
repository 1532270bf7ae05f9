//! Artifact registration
//!
//! Maps a module's discovered artifacts into a [`Package`]:
//! - each host class becomes an application class named `<namespace>.<file stem>`,
//!   discoverable by reflection so the runtime can construct it by name
//! - the binary descriptor becomes the resource `<namespace-path>/<file name>`,
//!   embedded into native targets
//! - the source stub is kept as an auxiliary output

use std::fs;
use std::path::Path;

use tracing::info;

use crate::build::package::{ModuleEntries, Package, Reflection};
use crate::build::scan::CompilationArtifactSet;
use crate::error::{Error, Result};
use crate::module::ModuleRegistry;

/// Glob registered for native targets when any module reads a WASM file
pub const WASM_FILE_GLOB: &str = "**/*.wasm";

/// Register one module's artifacts into `package`.
///
/// Every registered name is also recorded under the module key, so a later
/// rebuild can withdraw the whole set with [`Package::remove_module`].
pub fn register(artifacts: &CompilationArtifactSet, package: &mut Package) -> Result<()> {
    let name = &artifacts.name;
    let mut entries = ModuleEntries::default();

    for class in &artifacts.host_classes {
        let class_name = name.class_name(&file_stem(class)?);
        let bytes = fs::read(class).map_err(|e| Error::io(class, e))?;
        package.add_class(class_name.as_str(), bytes, true);
        package.add_reflective(class_name.as_str(), Reflection::all());
        info!(key = artifacts.key.as_str(), class = class_name.as_str(), "registered host class");
        entries.classes.insert(class_name);
    }

    let descriptor = &artifacts.binary_descriptor;
    let resource = name.resource_path(&file_name(descriptor)?);
    let bytes = fs::read(descriptor).map_err(|e| Error::io(descriptor, e))?;
    package.add_resource(resource.as_str(), bytes);
    package.add_native_resource(resource.as_str());
    info!(key = artifacts.key.as_str(), resource = resource.as_str(), "registered binary descriptor");
    entries.resources.insert(resource);

    let stub = &artifacts.source_stub;
    let stub_path = name.resource_path(&file_name(stub)?);
    let bytes = fs::read(stub).map_err(|e| Error::io(stub, e))?;
    package.add_auxiliary(stub_path.as_str(), bytes);
    info!(key = artifacts.key.as_str(), source = stub_path.as_str(), "registered source stub");
    entries.auxiliary.insert(stub_path);

    package.record_module(artifacts.key.as_str(), entries);
    Ok(())
}

/// Register package-wide entries that depend on the whole registry
pub fn register_payload_globs(registry: &ModuleRegistry, package: &mut Package) {
    if registry.has_wasm_files() {
        package.add_native_resource_glob(WASM_FILE_GLOB);
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Package(format!("artifact {} has no file name", path.display())))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Package(format!("artifact {} has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::QualifiedName;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn artifacts(dir: &Path) -> CompilationArtifactSet {
        let write = |rel: &str, bytes: &[u8]| -> PathBuf {
            let path = dir.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, bytes).unwrap();
            path
        };
        CompilationArtifactSet {
            key: "math".into(),
            name: QualifiedName::parse("pkg.Add").unwrap(),
            host_classes: [
                write("classes/pkg/AddMachine.hbc", b"machine"),
                write("classes/pkg/Add$1.hbc", b"inner"),
            ]
            .into_iter()
            .collect(),
            binary_descriptor: write("wasm/Add.meta", b"descriptor"),
            source_stub: write("generated-sources/pkg/Add.rs", b"stub"),
            interpreted_functions: BTreeSet::new(),
        }
    }

    #[test]
    fn test_register_names() {
        let dir = TempDir::new().unwrap();
        let mut package = Package::new();
        register(&artifacts(dir.path()), &mut package).unwrap();

        let classes: Vec<&str> = package.classes().map(|(n, _)| n).collect();
        assert_eq!(classes, vec!["pkg.Add$1", "pkg.AddMachine"]);
        assert!(package.class("pkg.AddMachine").unwrap().application);
        assert_eq!(package.reflection("pkg.AddMachine"), Some(Reflection::all()));

        assert_eq!(package.resource("pkg/Add.meta"), Some(&b"descriptor"[..]));
        assert!(package.is_native_resource("pkg/Add.meta"));
        assert_eq!(package.auxiliary("pkg/Add.rs"), Some(&b"stub"[..]));

        let entries = package.module_entries("math").unwrap();
        assert_eq!(entries.classes.len(), 2);
        assert!(entries.resources.contains("pkg/Add.meta"));
        assert!(entries.auxiliary.contains("pkg/Add.rs"));
    }

    #[test]
    fn test_missing_artifact_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut set = artifacts(dir.path());
        set.binary_descriptor = dir.path().join("wasm/Gone.meta");
        let err = register(&set, &mut Package::new()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
