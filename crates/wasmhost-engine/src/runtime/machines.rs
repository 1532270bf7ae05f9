//! Ahead-of-time machine registry
//!
//! Populated once at startup from the packaged classes: every reflective,
//! constructor-enabled class whose name ends in `Machine` is handed to the
//! engine's [`MachineLoader`]. Lookups afterwards are by exact class name.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use wasmhost_sdk::{EngineError, Instance, Machine, MachineConstructor, MachineLoader};

use crate::build::Package;
use crate::error::{Error, Result};
use crate::module::MACHINE_SUFFIX;

/// Machine class name → constructor (or the reason it could not be loaded)
#[derive(Default)]
pub struct MachineRegistry {
    constructors: FxHashMap<String, std::result::Result<MachineConstructor, EngineError>>,
}

impl MachineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every machine class of `package` through `loader`
    pub fn from_package(package: &Package, loader: &dyn MachineLoader) -> Self {
        let mut registry = Self::new();
        for (name, class) in package.classes() {
            let constructible = package
                .reflection(name)
                .map(|r| r.constructors)
                .unwrap_or(false);
            if !constructible || !name.ends_with(MACHINE_SUFFIX) {
                continue;
            }
            match loader.load(name, &class.bytes) {
                Ok(constructor) => {
                    debug!(class = name, "machine class loaded");
                    registry.register(name, constructor);
                }
                Err(error) => {
                    warn!(class = name, %error, "machine class failed to load");
                    registry.constructors.insert(name.to_string(), Err(error));
                }
            }
        }
        registry
    }

    /// Register a constructor directly
    pub fn register(&mut self, class: impl Into<String>, constructor: MachineConstructor) {
        self.constructors.insert(class.into(), Ok(constructor));
    }

    /// Whether `class` was seen at startup (loaded or not)
    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Number of known classes
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether no class is known
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Instantiate `class` over `instance`
    pub fn instantiate(&self, class: &str, instance: &dyn Instance) -> Result<Box<dyn Machine>> {
        match self.constructors.get(class) {
            None => Err(Error::MachineClassNotFound {
                class: class.to_string(),
            }),
            Some(Err(source)) => Err(Error::MachineConstruction {
                class: class.to_string(),
                source: source.clone(),
            }),
            Some(Ok(constructor)) => constructor(instance).map_err(|source| {
                Error::MachineConstruction {
                    class: class.to_string(),
                    source,
                }
            }),
        }
    }
}

impl std::fmt::Debug for MachineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        classes.sort_unstable();
        f.debug_struct("MachineRegistry")
            .field("classes", &classes)
            .finish()
    }
}
