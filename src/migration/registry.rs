//! Registered sources and regularizers of an orchestrator.

use super::types::{MigrationSource, Regularizer};
use std::sync::Arc;

/// Append-only lists of everything registered with an orchestrator.
///
/// Entries keep their registration order; there is no unregistration.
#[derive(Default)]
pub struct Registry {
    sources: Vec<Arc<dyn MigrationSource>>,
    regularizers: Vec<Arc<dyn Regularizer>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sources<I>(&mut self, sources: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn MigrationSource>>,
    {
        let before = self.sources.len();
        self.sources.extend(sources);
        self.sources.len() - before
    }

    pub fn add_regularizers<I>(&mut self, regularizers: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Regularizer>>,
    {
        let before = self.regularizers.len();
        self.regularizers.extend(regularizers);
        self.regularizers.len() - before
    }

    pub fn sources(&self) -> &[Arc<dyn MigrationSource>] {
        &self.sources
    }

    pub fn regularizers(&self) -> &[Arc<dyn Regularizer>] {
        &self.regularizers
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}
