// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Worker launch configuration.
//!
//! A [`WorkerLaunchSpec`] is assembled fresh for every spawn attempt by running
//! a fixed chain of [`WorkerConfigurator`]s over it. Configurators only add:
//! every collection de-duplicates by value, so re-running the chain (on retry)
//! leaves the launch spec unchanged.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;

/// Insertion-ordered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedSet<T: Eq + Hash> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T: Eq + Hash> Default for OrderedSet<T> {
    fn default() -> Self {
        Self { items: Vec::new(), seen: HashSet::new() }
    }
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless already present. Returns whether it was added.
    pub fn insert(&mut self, item: T) -> bool {
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.items.push(item);
        true
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.insert(item);
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.seen.contains(item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Everything the process spawner needs to start one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerLaunchSpec {
    pub classpath: OrderedSet<PathBuf>,
    pub module_path: OrderedSet<PathBuf>,
    system_properties: BTreeMap<String, String>,
    pub jvm_args: OrderedSet<String>,
    /// Whether the test runtime is launched as a module.
    pub modular: bool,
}

impl WorkerLaunchSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a system property. The first value for a key wins; a conflicting
    /// later value is ignored. Returns whether the property was added.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        match self.system_properties.get(&key) {
            Some(existing) if *existing == value => false,
            Some(existing) => {
                tracing::warn!(
                    "ignoring conflicting value for property {}: keeping {:?}, dropping {:?}",
                    key,
                    existing,
                    value
                );
                false
            }
            None => {
                self.system_properties.insert(key, value);
                true
            }
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.system_properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.system_properties.get(key).map(String::as_str)
    }

    /// Join the classpath into a platform path list.
    pub fn joined_classpath(&self) -> Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(self.classpath.iter())
    }

    /// Join the module path into a platform path list.
    pub fn joined_module_path(&self) -> Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(self.module_path.iter())
    }
}

/// Framework- or run-specific adjustment applied before each spawn.
///
/// Implementations must be idempotent: applying twice equals applying once.
pub trait WorkerConfigurator: Send + Sync {
    fn configure(&self, spec: &mut WorkerLaunchSpec);
}

/// Applies configurators strictly in order.
#[derive(Clone, Default)]
pub struct ConfiguratorChain {
    links: Vec<Arc<dyn WorkerConfigurator>>,
}

impl ConfiguratorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, configurator: Arc<dyn WorkerConfigurator>) -> Self {
        self.links.push(configurator);
        self
    }

    /// Build a fresh spec and run every configurator over it.
    pub fn build(&self) -> WorkerLaunchSpec {
        let mut spec = WorkerLaunchSpec::new();
        self.apply(&mut spec);
        spec
    }

    pub fn apply(&self, spec: &mut WorkerLaunchSpec) {
        for link in &self.links {
            link.configure(spec);
        }
    }
}

impl WorkerConfigurator for ConfiguratorChain {
    fn configure(&self, spec: &mut WorkerLaunchSpec) {
        self.apply(spec);
    }
}

/// Run-level settings every worker receives, whatever its framework.
#[derive(Debug, Clone, Default)]
pub struct BaseConfigurator {
    pub classpath: Vec<PathBuf>,
    pub module_path: Vec<PathBuf>,
    pub properties: BTreeMap<String, String>,
    pub jvm_args: Vec<String>,
    pub modular: bool,
}

impl WorkerConfigurator for BaseConfigurator {
    fn configure(&self, spec: &mut WorkerLaunchSpec) {
        spec.classpath.extend(self.classpath.iter().cloned());
        spec.module_path.extend(self.module_path.iter().cloned());
        spec.jvm_args.extend(self.jvm_args.iter().cloned());
        for (key, value) in &self.properties {
            spec.add_property(key.clone(), value.clone());
        }
        spec.modular |= self.modular;
    }
}
