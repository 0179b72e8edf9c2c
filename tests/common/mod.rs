#![allow(dead_code)]

use async_trait::async_trait;
use sqlmig::{
    AssetSource, CancellationToken, MemoryDatabase, MemoryEngine, MigrationError,
    MigrationSource, Orchestrator, RegularizeError, Regularizer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Should create temp dir")
}

/// An orchestrator over a fresh in-memory database with table prefix `mig`.
pub fn memory_orchestrator() -> (Arc<MemoryDatabase>, Orchestrator<MemoryDatabase>) {
    let db = Arc::new(MemoryDatabase::new());
    let orchestrator = Orchestrator::new(
        db.clone(),
        Arc::new(MemoryEngine::new()),
        "postgres",
        "mig",
    );
    (db, orchestrator)
}

/// An in-memory source with `count` units named `<n>_<name>.sql`.
pub fn asset_source(name: &str, count: usize) -> Arc<dyn MigrationSource> {
    let mut source = AssetSource::new(name);
    for n in 1..=count {
        source.insert(
            format!("{}_{}.sql", n, name),
            format!("-- {} unit {}", name, n),
        );
    }
    Arc::new(source)
}

/// A source that lists ids whose content may be missing.
pub struct StubSource {
    name: String,
    ids: Vec<String>,
    content: HashMap<String, Vec<u8>>,
}

impl StubSource {
    pub fn new(name: &str, ids: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            ids: ids.iter().map(|s| s.to_string()).collect(),
            content: HashMap::new(),
        }
    }

    pub fn with_content(mut self, id: &str, content: &str) -> Self {
        self.content.insert(id.to_string(), content.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl MigrationSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn unit_ids(&self, _scope: &str) -> Result<Vec<String>, MigrationError> {
        Ok(self.ids.clone())
    }

    async fn unit_content(&self, unit_id: &str) -> Result<Vec<u8>, MigrationError> {
        self.content
            .get(unit_id)
            .cloned()
            .ok_or_else(|| MigrationError::UnitNotFound(unit_id.to_string()))
    }
}

/// A regularizer that records its invocation in a shared log.
pub struct RecordingRegularizer {
    pub name: &'static str,
    pub fail: bool,
    pub log: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingRegularizer {
    pub fn new(
        name: &'static str,
        fail: bool,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Regularizer> {
        Arc::new(Self {
            name,
            fail,
            log: log.clone(),
        })
    }
}

#[async_trait]
impl Regularizer for RecordingRegularizer {
    fn name(&self) -> &str {
        self.name
    }

    async fn regularize(&self, _ctx: &CancellationToken) -> Result<(), RegularizeError> {
        self.log.lock().unwrap().push(self.name);
        if self.fail {
            return Err(RegularizeError::Failed {
                regularizer: self.name.to_string(),
                message: "backfill failed".to_string(),
            });
        }
        Ok(())
    }
}
