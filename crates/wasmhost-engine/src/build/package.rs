//! Packaged build output
//!
//! A [`Package`] is what the registrar fills: loadable classes, their
//! reflection flags, packaged resources (and which of them a native target
//! must embed), plus auxiliary outputs such as source stubs.
//!
//! On disk it is a directory holding `manifest.json` and one file per
//! payload. Every payload carries a SHA-256 digest that is verified on load.
//!
//! ```text
//! <dir>/
//! ├── manifest.json
//! ├── classes/<fully.qualified.Name>
//! ├── resources/<ns/path/Name.meta>
//! └── auxiliary/<ns/path/Name.rs>
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Manifest file name inside a package directory
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// A loadable class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Class bytes
    pub bytes: Vec<u8>,
    /// Registered as an application class (not a library one)
    pub application: bool,
}

/// What may be discovered by name on a class at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reflection {
    /// Constructors
    pub constructors: bool,
    /// Methods
    pub methods: bool,
    /// Fields
    pub fields: bool,
}

impl Reflection {
    /// Constructors, methods and fields all discoverable
    pub fn all() -> Self {
        Self {
            constructors: true,
            methods: true,
            fields: true,
        }
    }

    fn union(self, other: Reflection) -> Self {
        Self {
            constructors: self.constructors || other.constructors,
            methods: self.methods || other.methods,
            fields: self.fields || other.fields,
        }
    }
}

/// Names registered on behalf of one module, so they can be withdrawn together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntries {
    /// Class names (each also has a reflection entry)
    pub classes: BTreeSet<String>,
    /// Resource paths (also listed as native resources)
    pub resources: BTreeSet<String>,
    /// Auxiliary output paths
    pub auxiliary: BTreeSet<String>,
}

/// Classes, reflection entries and resources produced by a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    classes: BTreeMap<String, ClassEntry>,
    reflective: BTreeMap<String, Reflection>,
    resources: BTreeMap<String, Vec<u8>>,
    native_resources: BTreeSet<String>,
    native_resource_globs: BTreeSet<String>,
    auxiliary: BTreeMap<String, Vec<u8>>,
    modules: BTreeMap<String, ModuleEntries>,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loadable class
    pub fn add_class(&mut self, name: impl Into<String>, bytes: Vec<u8>, application: bool) {
        self.classes
            .insert(name.into(), ClassEntry { bytes, application });
    }

    /// Make a class discoverable by reflection. Repeated calls widen the flags.
    pub fn add_reflective(&mut self, name: impl Into<String>, reflection: Reflection) {
        let entry = self.reflective.entry(name.into()).or_default();
        *entry = entry.union(reflection);
    }

    /// Register a packaged resource
    pub fn add_resource(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.resources.insert(path.into(), bytes);
    }

    /// Mark a resource as embedded into native targets
    pub fn add_native_resource(&mut self, path: impl Into<String>) {
        self.native_resources.insert(path.into());
    }

    /// Embed every resource matching `glob` into native targets
    pub fn add_native_resource_glob(&mut self, glob: impl Into<String>) {
        self.native_resource_globs.insert(glob.into());
    }

    /// Register an auxiliary output (not compiled further)
    pub fn add_auxiliary(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.auxiliary.insert(path.into(), bytes);
    }

    /// Look up a class
    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    /// All classes in name order
    pub fn classes(&self) -> impl Iterator<Item = (&str, &ClassEntry)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reflection flags of a class
    pub fn reflection(&self, name: &str) -> Option<Reflection> {
        self.reflective.get(name).copied()
    }

    /// Look up a resource
    pub fn resource(&self, path: &str) -> Option<&[u8]> {
        self.resources.get(path).map(Vec::as_slice)
    }

    /// All resource paths in order
    pub fn resource_paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Whether a native target embeds `path`, either explicitly or through a glob
    pub fn is_native_resource(&self, path: &str) -> bool {
        self.native_resources.contains(path)
            || self.native_resource_globs.iter().any(|g| {
                glob::Pattern::new(g)
                    .map(|p| p.matches(path))
                    .unwrap_or(false)
            })
    }

    /// Registered native resource globs
    pub fn native_resource_globs(&self) -> impl Iterator<Item = &str> {
        self.native_resource_globs.iter().map(String::as_str)
    }

    /// Look up an auxiliary output
    pub fn auxiliary(&self, path: &str) -> Option<&[u8]> {
        self.auxiliary.get(path).map(Vec::as_slice)
    }

    /// All auxiliary paths in order
    pub fn auxiliary_paths(&self) -> impl Iterator<Item = &str> {
        self.auxiliary.keys().map(String::as_str)
    }

    /// Record that `entries` were registered for module `key`
    pub fn record_module(&mut self, key: impl Into<String>, entries: ModuleEntries) {
        let owned = self.modules.entry(key.into()).or_default();
        owned.classes.extend(entries.classes);
        owned.resources.extend(entries.resources);
        owned.auxiliary.extend(entries.auxiliary);
    }

    /// Entries registered for module `key`
    pub fn module_entries(&self, key: &str) -> Option<&ModuleEntries> {
        self.modules.get(key)
    }

    /// Withdraw everything registered for module `key`
    pub fn remove_module(&mut self, key: &str) -> Option<ModuleEntries> {
        let entries = self.modules.remove(key)?;
        for class in &entries.classes {
            self.classes.remove(class);
            self.reflective.remove(class);
        }
        for resource in &entries.resources {
            self.resources.remove(resource);
            self.native_resources.remove(resource);
        }
        for path in &entries.auxiliary {
            self.auxiliary.remove(path);
        }
        Some(entries)
    }

    /// Layer `other` on top of this package; entries in `other` win
    pub fn extend(&mut self, other: Package) {
        self.classes.extend(other.classes);
        for (name, reflection) in other.reflective {
            self.add_reflective(name, reflection);
        }
        self.resources.extend(other.resources);
        self.native_resources.extend(other.native_resources);
        self.native_resource_globs.extend(other.native_resource_globs);
        self.auxiliary.extend(other.auxiliary);
        for (key, entries) in other.modules {
            self.record_module(key, entries);
        }
    }

    /// Whether nothing was registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.reflective.is_empty()
            && self.resources.is_empty()
            && self.native_resources.is_empty()
            && self.native_resource_globs.is_empty()
            && self.auxiliary.is_empty()
            && self.modules.is_empty()
    }

    /// Persist the package under `dir`.
    ///
    /// Payload files are written first; the manifest goes last through a
    /// temporary file and a rename, so a reader never sees a manifest that
    /// points at missing payloads.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let mut manifest = Manifest {
            version: MANIFEST_VERSION,
            classes: Vec::new(),
            reflective: self.reflective.clone(),
            resources: Vec::new(),
            native_resources: self.native_resources.clone(),
            native_resource_globs: self.native_resource_globs.clone(),
            auxiliary: Vec::new(),
            modules: self.modules.clone(),
        };

        for (name, entry) in &self.classes {
            let file = write_payload(dir, "classes", name, &entry.bytes)?;
            manifest.classes.push(ManifestClass {
                name: name.clone(),
                application: entry.application,
                file: file.file,
                sha256: file.sha256,
            });
        }
        for (path, bytes) in &self.resources {
            manifest.resources.push(write_payload(dir, "resources", path, bytes)?);
        }
        for (path, bytes) in &self.auxiliary {
            manifest.auxiliary.push(write_payload(dir, "auxiliary", path, bytes)?);
        }

        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| Error::Package(format!("cannot serialize manifest: {}", e)))?;
        let tmp_path = dir.join(format!("{}.tmp", MANIFEST_FILE));
        let mut tmp = fs::File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.sync_all())
            .map_err(|e| Error::io(&tmp_path, e))?;
        let final_path = dir.join(MANIFEST_FILE);
        fs::rename(&tmp_path, &final_path).map_err(|e| Error::io(&final_path, e))?;
        Ok(())
    }

    /// Load a package written by [`Package::write_to`], verifying every digest
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let content = fs::read(&manifest_path).map_err(|e| Error::io(&manifest_path, e))?;
        let manifest: Manifest = serde_json::from_slice(&content)
            .map_err(|e| Error::Package(format!("invalid manifest: {}", e)))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(Error::Package(format!(
                "unsupported manifest version {} (expected {})",
                manifest.version, MANIFEST_VERSION
            )));
        }

        let mut package = Package {
            reflective: manifest.reflective,
            native_resources: manifest.native_resources,
            native_resource_globs: manifest.native_resource_globs,
            modules: manifest.modules,
            ..Package::default()
        };
        for class in manifest.classes {
            let bytes = read_payload(dir, &class.file, &class.sha256)?;
            package.add_class(class.name, bytes, class.application);
        }
        for resource in manifest.resources {
            let bytes = read_payload(dir, &resource.file, &resource.sha256)?;
            package.add_resource(resource.path, bytes);
        }
        for aux in manifest.auxiliary {
            let bytes = read_payload(dir, &aux.file, &aux.sha256)?;
            package.add_auxiliary(aux.path, bytes);
        }
        Ok(package)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    classes: Vec<ManifestClass>,
    reflective: BTreeMap<String, Reflection>,
    resources: Vec<ManifestFile>,
    native_resources: BTreeSet<String>,
    native_resource_globs: BTreeSet<String>,
    auxiliary: Vec<ManifestFile>,
    #[serde(default)]
    modules: BTreeMap<String, ModuleEntries>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestClass {
    name: String,
    application: bool,
    file: String,
    sha256: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    path: String,
    file: String,
    sha256: String,
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn write_payload(dir: &Path, section: &str, path: &str, bytes: &[u8]) -> Result<ManifestFile> {
    let file = format!("{}/{}", section, path);
    let target = safe_join(dir, &file)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(&target, bytes).map_err(|e| Error::io(&target, e))?;
    Ok(ManifestFile {
        path: path.to_string(),
        file,
        sha256: digest(bytes),
    })
}

fn read_payload(dir: &Path, file: &str, expected: &str) -> Result<Vec<u8>> {
    let path = safe_join(dir, file)?;
    let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
    let actual = digest(&bytes);
    if actual != expected {
        return Err(Error::Package(format!(
            "checksum mismatch for {}: expected {}, got {}",
            file, expected, actual
        )));
    }
    Ok(bytes)
}

/// Join a manifest-relative path, refusing anything that escapes `dir`
fn safe_join(dir: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || relative.as_os_str().is_empty() {
        return Err(Error::Package(format!(
            "invalid payload path '{}'",
            relative.display()
        )));
    }
    Ok(dir.join(relative))
}
