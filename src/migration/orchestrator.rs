//! Orchestrator for running every registered migration source.

use super::registry::Registry;
use super::result::{MigrationResult, ResultSet};
use super::types::{
    ExecRequest, MigrationDirection, MigrationEngine, MigrationError, MigrationSource,
    RegularizeError, Regularizer,
};
use crate::config::SqlMigConfig;
use crate::utils::{namespace_for, ROOT_SCOPE};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs independently-versioned migration sources against one database.
///
/// Each source gets its own version-tracking namespace,
/// `<table_prefix>_<source name>`, so sources sharing a database never touch
/// each other's bookkeeping. A single lock serializes registration, migration
/// and regularization.
pub struct Orchestrator<D: ?Sized> {
    db: Arc<D>,
    engine: Arc<dyn MigrationEngine<D>>,
    dialect: String,
    table_prefix: String,
    scope: String,
    registry: Mutex<Registry>,
}

impl<D: ?Sized + Send + Sync> Orchestrator<D> {
    /// Create an orchestrator for one database handle and dialect.
    pub fn new(
        db: Arc<D>,
        engine: Arc<dyn MigrationEngine<D>>,
        dialect: impl Into<String>,
        table_prefix: impl Into<String>,
    ) -> Self {
        Self {
            db,
            engine,
            dialect: dialect.into(),
            table_prefix: table_prefix.into(),
            scope: ROOT_SCOPE.to_string(),
            registry: Mutex::new(Registry::new()),
        }
    }

    /// Create an orchestrator taking dialect, table prefix and scope from config.
    pub fn from_config(
        db: Arc<D>,
        engine: Arc<dyn MigrationEngine<D>>,
        config: &SqlMigConfig,
    ) -> Self {
        let mut orchestrator = Self::new(db, engine, &config.dialect, &config.table_prefix);
        orchestrator.scope = config.scope.clone();
        orchestrator
    }

    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Register migration sources. Sources are not validated until they run.
    pub async fn register_sources<I>(&self, sources: I)
    where
        I: IntoIterator<Item = Arc<dyn MigrationSource>>,
    {
        let sources: Vec<_> = sources.into_iter().collect();
        if sources.is_empty() {
            return;
        }

        let mut registry = self.registry.lock().await;
        let added = registry.add_sources(sources);
        debug!(added, total = registry.sources().len(), "Registered migration sources");
    }

    /// Register regularizers, run by `regularize` in registration order.
    pub async fn register_regularizers<I>(&self, regularizers: I)
    where
        I: IntoIterator<Item = Arc<dyn Regularizer>>,
    {
        let regularizers: Vec<_> = regularizers.into_iter().collect();
        if regularizers.is_empty() {
            return;
        }

        let mut registry = self.registry.lock().await;
        let added = registry.add_regularizers(regularizers);
        debug!(added, total = registry.regularizers().len(), "Registered regularizers");
    }

    pub async fn source_count(&self) -> usize {
        self.registry.lock().await.sources().len()
    }

    pub async fn regularizer_count(&self) -> usize {
        self.registry.lock().await.regularizers().len()
    }

    pub async fn source_names(&self) -> Vec<String> {
        self.registry.lock().await.source_names()
    }

    /// Apply every registered source, in registration order.
    ///
    /// A failing source does not stop the sources after it; inspect the
    /// returned set for errors.
    pub async fn migrate(&self) -> ResultSet {
        self.run(MigrationDirection::Up).await
    }

    /// Revert every registered source, in registration order.
    pub async fn rollback(&self) -> ResultSet {
        self.run(MigrationDirection::Down).await
    }

    /// Run every registered regularizer in registration order.
    ///
    /// Stops at the first failure and returns it; the remaining regularizers
    /// are skipped. `ctx` is handed to each regularizer unchanged.
    pub async fn regularize(&self, ctx: &CancellationToken) -> Result<(), RegularizeError> {
        let registry = self.registry.lock().await;

        for regularizer in registry.regularizers() {
            if ctx.is_cancelled() {
                warn!(regularizer = regularizer.name(), "Regularization cancelled");
                return Err(RegularizeError::Cancelled);
            }

            debug!(regularizer = regularizer.name(), "Running regularizer");
            if let Err(e) = regularizer.regularize(ctx).await {
                error!(regularizer = regularizer.name(), error = %e, "Regularizer failed");
                return Err(e);
            }
        }

        Ok(())
    }

    async fn run(&self, direction: MigrationDirection) -> ResultSet {
        let registry = self.registry.lock().await;
        let mut results = ResultSet::new();
        let mut namespaces = HashSet::new();

        info!(
            %direction,
            sources = registry.sources().len(),
            prefix = %self.table_prefix,
            "Starting migration run"
        );

        for source in registry.sources() {
            let table = namespace_for(&self.table_prefix, source.name());
            let result = if !namespaces.insert(table.clone()) {
                MigrationResult::new(
                    source.name(),
                    0,
                    Some(MigrationError::DuplicateNamespace(table)),
                )
            } else {
                self.run_source(source.as_ref(), &table, direction).await
            };

            match result.err() {
                None => info!(source = %result, "Source completed"),
                Some(e) => error!(source = %result, error = %e, "Source failed"),
            }
            results.push(result);
        }

        if results.has_error() {
            warn!(%direction, results = %results, "Migration run finished with errors");
        } else {
            info!(%direction, results = %results, "Migration run finished");
        }

        results
    }

    async fn run_source(
        &self,
        source: &dyn MigrationSource,
        table: &str,
        direction: MigrationDirection,
    ) -> MigrationResult {
        debug!(source = source.name(), table, %direction, "Running source");

        let outcome = self
            .engine
            .exec(
                self.db.as_ref(),
                ExecRequest {
                    dialect: &self.dialect,
                    table,
                    scope: &self.scope,
                    source,
                    direction,
                },
            )
            .await;

        MigrationResult::new(source.name(), outcome.applied, outcome.error)
    }
}
