//! Per-module context slots
//!
//! Each module key owns one slot holding an `Arc<ModuleSnapshot>`. Readers
//! clone the `Arc` under a short read lock and keep using that snapshot for
//! as long as they like. A rebuild holds the slot's rebuild mutex for its
//! whole duration and publishes the new snapshot with a single pointer swap,
//! so a reader sees either the old snapshot or the new one, never a mix.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::info;

use crate::build::Package;
use crate::context::{ExecutionContext, ModuleWarning};
use crate::error::{Error, Result};
use crate::mode::Deployment;
use crate::module::{ModuleDescriptor, ModuleRegistry};

/// Everything needed to serve one module, swapped as a unit
#[derive(Debug, Clone)]
pub struct ModuleSnapshot {
    /// Accepted module
    pub descriptor: Arc<ModuleDescriptor>,
    /// Resolved execution context
    pub context: ExecutionContext,
    /// Selection warning raised while deriving the context
    pub warning: Option<ModuleWarning>,
    /// Packaged artifacts the module is served from
    pub package: Arc<Package>,
    /// Bumped on every successful rebuild
    pub generation: u64,
}

impl ModuleSnapshot {
    /// Derive a first-generation snapshot
    pub fn new(
        descriptor: Arc<ModuleDescriptor>,
        deployment: &Deployment,
        package: Arc<Package>,
    ) -> Self {
        let (context, warning) = ExecutionContext::derive(&descriptor, deployment);
        Self {
            descriptor,
            context,
            warning,
            package,
            generation: 0,
        }
    }
}

struct Slot {
    current: RwLock<Arc<ModuleSnapshot>>,
    rebuild: Mutex<()>,
}

/// Current snapshot of every module, keyed by module key
pub struct ContextStore {
    slots: FxHashMap<String, Slot>,
}

impl ContextStore {
    /// Derive a snapshot for every registered module
    pub fn new(registry: &ModuleRegistry, deployment: &Deployment, package: Arc<Package>) -> Self {
        let slots = registry
            .iter()
            .map(|descriptor| {
                let snapshot =
                    ModuleSnapshot::new(Arc::clone(descriptor), deployment, Arc::clone(&package));
                info!(
                    key = descriptor.key(),
                    mode = %snapshot.context.resolved_mode(),
                    "execution context ready"
                );
                let slot = Slot {
                    current: RwLock::new(Arc::new(snapshot)),
                    rebuild: Mutex::new(()),
                };
                (descriptor.key().to_string(), slot)
            })
            .collect();
        Self { slots }
    }

    /// Current snapshot of a module
    pub fn get(&self, key: &str) -> Option<Arc<ModuleSnapshot>> {
        self.slots.get(key).map(|slot| Arc::clone(&slot.current.read()))
    }

    /// Module keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Current snapshots in key order
    pub fn snapshots(&self) -> Vec<Arc<ModuleSnapshot>> {
        self.keys().iter().filter_map(|k| self.get(k)).collect()
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store holds no module
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Rebuild a module's snapshot and swap it in.
    ///
    /// `build` runs with exclusive access to the slot and receives the
    /// snapshot being replaced. On error nothing is swapped. The generation
    /// of the published snapshot is always the previous one plus one.
    pub fn rebuild<F>(&self, key: &str, build: F) -> Result<Arc<ModuleSnapshot>>
    where
        F: FnOnce(&ModuleSnapshot) -> Result<ModuleSnapshot>,
    {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| Error::configuration(key, "module is not registered"))?;
        let _guard = slot.rebuild.lock();

        let previous = Arc::clone(&slot.current.read());
        let mut next = build(&previous)?;
        next.generation = previous.generation + 1;
        let next = Arc::new(next);

        *slot.current.write() = Arc::clone(&next);
        info!(key, generation = next.generation, "execution context swapped");
        Ok(next)
    }
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("modules", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WasmConfig;
    use std::path::Path;

    fn store() -> ContextStore {
        let config = WasmConfig::from_str(
            "[modules.math]\nname = \"pkg.Add\"\nwasm-file = \"add.wasm\"\n\n[modules.dyn]\nname = \"pkg.Dyn\"\n",
        )
        .unwrap();
        let deployment = Deployment::default();
        let (registry, _) = ModuleRegistry::from_config(&config, Path::new("/p"), &deployment);
        ContextStore::new(&registry, &deployment, Arc::new(Package::new()))
    }

    #[test]
    fn test_snapshots_per_module() {
        let store = store();
        assert_eq!(store.keys(), vec!["dyn", "math"]);
        let math = store.get("math").unwrap();
        assert_eq!(math.generation, 0);
        assert!(!math.context.is_dynamic());
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_rebuild_swaps_and_bumps_generation() {
        let store = store();
        let old = store.get("math").unwrap();
        let mut package = Package::new();
        package.add_resource("pkg/Add.meta", b"v2".to_vec());
        let package = Arc::new(package);

        let new = store
            .rebuild("math", |prev| {
                Ok(ModuleSnapshot {
                    package: Arc::clone(&package),
                    ..prev.clone()
                })
            })
            .unwrap();
        assert_eq!(new.generation, 1);
        assert_eq!(store.get("math").unwrap().generation, 1);
        assert!(old.package.resource("pkg/Add.meta").is_none());
        assert_eq!(store.get("math").unwrap().package.resource("pkg/Add.meta"), Some(&b"v2"[..]));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous() {
        let store = store();
        let err = store
            .rebuild("math", |_| Err(Error::Package("boom".into())))
            .unwrap_err();
        assert!(matches!(err, Error::Package(_)));
        assert_eq!(store.get("math").unwrap().generation, 0);
        assert!(store.rebuild("nope", |p| Ok(p.clone())).is_err());
    }
}
