//! Policy module registry and load ordering.
//!
//! A [`ModuleSet`] holds policy modules and the names they import. Loading
//! must visit every import before the modules that import it, so
//! [`ModuleSet::load_order`] builds a [`DependencyGraph`] with one edge
//! `import -> importer` per import and sorts it.
//!
//! ```text
//!   authz  imports [roles, common]
//!   roles  imports [common]
//!   common imports []
//!
//!   edges: roles -> authz, common -> authz, common -> roles
//!   order: common, roles, authz
//! ```

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::traits::Identity;

/// Errors from [`ModuleSet::load_order`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// An import names no registered module.
    #[error("module `{module}` imports unknown module `{import}`")]
    MissingImport { module: String, import: String },

    /// Self-import or import cycle.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A named policy module and the modules it imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModule {
    pub name: String,
    pub imports: Vec<String>,
    pub source: String,
}

impl PolicyModule {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imports: Vec::new(),
            source: source.into(),
        }
    }

    /// Adds an import, keeping declaration order.
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }
}

impl Identity for PolicyModule {
    fn identity(&self) -> &str {
        &self.name
    }
}

/// Registered modules in first-registration order.
#[derive(Debug, Default, Clone)]
pub struct ModuleSet {
    modules: Vec<PolicyModule>,
    index: FxHashMap<String, usize>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module`. Re-registering a name replaces the earlier module
    /// but keeps its original position.
    pub fn insert(&mut self, module: PolicyModule) {
        match self.index.get(&module.name) {
            Some(&slot) => self.modules[slot] = module,
            None => {
                self.index.insert(module.name.clone(), self.modules.len());
                self.modules.push(module);
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&PolicyModule> {
        self.index.get(name).map(|&slot| &self.modules[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicyModule> {
        self.modules.iter()
    }

    /// Returns the modules ordered so that every import precedes its
    /// importers. Independent modules keep registration order.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::MissingImport`] for the first import (in registration
    ///   and declaration order) that names no registered module.
    /// - [`ModuleError::Graph`] wrapping [`GraphError::SelfLoop`] for a module
    ///   that imports itself, or [`GraphError::CycleDetected`] with the import
    ///   cycle path.
    pub fn load_order(&self) -> Result<Vec<&PolicyModule>, ModuleError> {
        let graph: DependencyGraph<&PolicyModule> = self.modules.iter().collect();

        for module in &self.modules {
            for import in &module.imports {
                if !self.contains(import) {
                    return Err(ModuleError::MissingImport {
                        module: module.name.clone(),
                        import: import.clone(),
                    });
                }
                graph.add_edge(import, &module.name)?;
            }
        }

        let order: Vec<&PolicyModule> = graph.topo_sort_values()?.into_iter().copied().collect();
        debug!(modules = order.len(), "computed module load order");
        Ok(order)
    }
}

impl Extend<PolicyModule> for ModuleSet {
    fn extend<I: IntoIterator<Item = PolicyModule>>(&mut self, modules: I) {
        for module in modules {
            self.insert(module);
        }
    }
}

impl FromIterator<PolicyModule> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = PolicyModule>>(modules: I) -> Self {
        let mut set = Self::new();
        set.extend(modules);
        set
    }
}
