//! The workflow registry: parsed definitions keyed by name.
//!
//! Readers take a snapshot (`Arc`) of the catalog and never block writers for
//! longer than a pointer swap. Writers copy the current map, modify the copy,
//! and publish it, so an in-flight run keeps the definition it started with.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use lambdachain_types::{WorkflowDefinition, validate_definition};
use tracing::{info, warn};

use crate::{RegistryError, document::parse_workflow_document, source::WorkflowSource};

/// Immutable view of the registered workflows.
pub type CatalogSnapshot = Arc<IndexMap<String, Arc<WorkflowDefinition>>>;

/// Outcome of a bulk load: names that loaded and per-name failures.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, RegistryError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Holds workflow definitions loaded from a [`WorkflowSource`].
pub struct WorkflowRegistry {
    source: Arc<dyn WorkflowSource>,
    catalog: RwLock<CatalogSnapshot>,
}

impl std::fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRegistry").field("workflows", &self.list()).finish()
    }
}

impl WorkflowRegistry {
    /// Create an empty registry backed by `source`.
    pub fn new(source: Arc<dyn WorkflowSource>) -> Self {
        Self {
            source,
            catalog: RwLock::new(Arc::new(IndexMap::new())),
        }
    }

    /// Loads (or reloads) `name` from the source, replacing any prior definition.
    pub fn load(&self, name: &str) -> Result<Arc<WorkflowDefinition>, RegistryError> {
        let definition = Arc::new(self.read_definition(name)?);
        self.publish(|catalog| {
            catalog.insert(name.to_string(), Arc::clone(&definition));
        });
        info!(workflow = %name, steps = definition.steps.len(), "loaded workflow");
        Ok(definition)
    }

    /// Loads every workflow the source lists.
    ///
    /// Individual failures are logged and reported without aborting the rest.
    pub fn load_all(&self) -> Result<LoadReport, RegistryError> {
        let mut report = LoadReport::default();
        for name in self.source.names()? {
            match self.load(&name) {
                Ok(_) => report.loaded.push(name),
                Err(error) => {
                    warn!(workflow = %name, error = %error, "failed to load workflow");
                    report.failed.push((name, error));
                }
            }
        }
        Ok(report)
    }

    /// Rebuilds the catalog from the source and swaps it in as a whole.
    ///
    /// Workflows that fail to load are left out of the new catalog.
    pub fn reload_all(&self) -> Result<LoadReport, RegistryError> {
        let mut report = LoadReport::default();
        let mut fresh = IndexMap::new();
        for name in self.source.names()? {
            match self.read_definition(&name) {
                Ok(definition) => {
                    fresh.insert(name.clone(), Arc::new(definition));
                    report.loaded.push(name);
                }
                Err(error) => {
                    warn!(workflow = %name, error = %error, "failed to reload workflow");
                    report.failed.push((name, error));
                }
            }
        }
        let mut guard = self.catalog.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(fresh);
        Ok(report)
    }

    /// Registers an already parsed definition under its own name.
    pub fn insert(&self, definition: WorkflowDefinition) -> Result<Arc<WorkflowDefinition>, RegistryError> {
        validate_definition(&definition)?;
        let definition = Arc::new(definition);
        self.publish(|catalog| {
            catalog.insert(definition.name.clone(), Arc::clone(&definition));
        });
        Ok(definition)
    }

    /// Returns the definition registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<WorkflowDefinition>, RegistryError> {
        self.snapshot().get(name).cloned().ok_or_else(|| RegistryError::not_found(name))
    }

    /// Names of all registered workflows, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    /// Current catalog; unaffected by later loads.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let guard = self.catalog.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    fn read_definition(&self, name: &str) -> Result<WorkflowDefinition, RegistryError> {
        let document = self.source.fetch(name)?;
        parse_workflow_document(name, &document)
    }

    fn publish<F>(&self, update: F)
    where
        F: FnOnce(&mut IndexMap<String, Arc<WorkflowDefinition>>),
    {
        let mut guard = self.catalog.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next: IndexMap<String, Arc<WorkflowDefinition>> = (**guard).clone();
        update(&mut next);
        *guard = Arc::new(next);
    }
}
