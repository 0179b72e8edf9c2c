//! In-memory migration source.

use super::scoped_id;
use crate::migration::types::{MigrationError, MigrationSource};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A migration source whose units are held in memory.
///
/// Units are kept in a `BTreeMap`, so enumeration is ascending by id no
/// matter in which order they were added. Ids may contain `/` to place a unit
/// under a scope; enumerating a scope lists only its direct children.
#[derive(Debug, Clone, Default)]
pub struct AssetSource {
    name: String,
    units: BTreeMap<String, Vec<u8>>,
}

impl AssetSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: BTreeMap::new(),
        }
    }

    /// Add a unit, replacing any unit with the same id.
    pub fn with_unit(mut self, id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(id, content);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.units.insert(id.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[async_trait]
impl MigrationSource for AssetSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn unit_ids(&self, scope: &str) -> Result<Vec<String>, MigrationError> {
        let prefix = scoped_id(scope, "");
        Ok(self
            .units
            .keys()
            .filter(|id| {
                id.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }

    async fn unit_content(&self, unit_id: &str) -> Result<Vec<u8>, MigrationError> {
        self.units
            .get(unit_id)
            .cloned()
            .ok_or_else(|| MigrationError::UnitNotFound(unit_id.to_string()))
    }
}
