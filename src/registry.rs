//! Workflow registry
//!
//! Maps a capability key to the [`WorkflowSpec`] that handles it. A key can be
//! registered once; a second registration under the same key is an error and
//! leaves the first entry in place.
//!
//! Writes (register, clear) take the write lock for the check-then-insert
//! only. Lookups take the shared read lock, so concurrent readers never block
//! each other.

use crate::capability::Capability;
use crate::error::RegistryError;
use crate::workflow::WorkflowSpec;
use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A named group of workflows that registers itself into a registry.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowModule {
    pub name: &'static str,
    pub register: fn(&Registry) -> Result<(), RegistryError>,
}

/// Thread-safe capability -> workflow map.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<String, WorkflowSpec>>,
    loaded_modules: RwLock<HashSet<&'static str>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `spec` under its capability key.
    ///
    /// Fails when the spec has a blank name or when the key is already taken.
    /// A capability with every field absent is a valid key (`__`).
    pub fn register(&self, spec: WorkflowSpec) -> Result<(), RegistryError> {
        if spec.name.trim().is_empty() {
            return Err(RegistryError::InvalidName);
        }

        let key = spec.capability.key();

        {
            let mut entries = self.write_entries();
            if entries.contains_key(&key) {
                return Err(RegistryError::DuplicateCapability { key });
            }
            debug!(workflow = %spec.name, capability = %spec.capability, key = %key, "registering workflow");
            entries.insert(key, spec);
        }

        Ok(())
    }

    /// Returns the spec registered for `capability`.
    pub fn get_workflow(&self, capability: &Capability) -> Result<WorkflowSpec, RegistryError> {
        self.read_entries()
            .get(&capability.key())
            .cloned()
            .ok_or_else(|| RegistryError::WorkflowNotFound {
                language: capability.language.clone(),
                dependency_manager: capability.dependency_manager.clone(),
                application_framework: capability.application_framework.clone(),
            })
    }

    /// Same as [`Registry::get_workflow`].
    pub fn lookup(&self, capability: &Capability) -> Result<WorkflowSpec, RegistryError> {
        self.get_workflow(capability)
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.read_entries().contains_key(&capability.key())
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Names of every registered workflow, sorted
    pub fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_entries()
            .values()
            .map(|spec| spec.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Removes every entry and forgets which modules were loaded.
    pub fn clear(&self) {
        self.write_entries().clear();
        self.loaded_modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        debug!("registry cleared");
    }

    /// Runs `module`'s registration unless it already ran against this registry.
    ///
    /// All or nothing: the module registers into a staging registry first, and
    /// its entries are merged only when every one of them is accepted. A failed
    /// load leaves this registry untouched and can be retried.
    pub fn load_module(&self, module: &WorkflowModule) -> Result<(), RegistryError> {
        let mut loaded = self
            .loaded_modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if loaded.contains(module.name) {
            debug!(module = module.name, "workflow module already loaded");
            return Ok(());
        }

        let staging = Registry::new();
        (module.register)(&staging)?;
        let staged = std::mem::take(&mut *staging.write_entries());

        {
            let mut entries = self.write_entries();
            if let Some(key) = staged.keys().find(|key| entries.contains_key(*key)) {
                return Err(RegistryError::DuplicateCapability { key: key.clone() });
            }
            for (key, spec) in staged {
                debug!(workflow = %spec.name, capability = %spec.capability, key = %key, "registering workflow");
                entries.insert(key, spec);
            }
        }

        loaded.insert(module.name);
        debug!(module = module.name, "loaded workflow module");
        Ok(())
    }

    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.loaded_modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(name)
    }

    // Every write is a single insert or clear, so a poisoned map is consistent.
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, WorkflowSpec>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, WorkflowSpec>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-wide registry used by [`crate::builder::Builder::new`].
pub fn default_registry() -> &'static Registry {
    static DEFAULT: OnceLock<Registry> = OnceLock::new();
    DEFAULT.get_or_init(Registry::new)
}
