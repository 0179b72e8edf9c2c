//! Multi-source migration orchestration.
//!
//! This module coordinates independently-versioned migration sources that
//! share one database, and the regularizers run after them.
//!
//! # Overview
//!
//! - Sources implement `MigrationSource`: a name, ordered unit ids and unit content
//! - A `MigrationEngine` applies or reverts one source's units in its own
//!   bookkeeping namespace (`<table prefix>_<source name>`)
//! - The `Orchestrator` runs every registered source and collects a
//!   `MigrationResult` per source into a `ResultSet`
//! - A failing source never stops the other sources; a failing regularizer
//!   stops the regularizers after it
//!
//! # Usage
//!
//! ```ignore
//! let db = Arc::new(MemoryDatabase::new());
//! let orchestrator = Orchestrator::new(db, Arc::new(MemoryEngine), "postgres", "migrations");
//! orchestrator.register_sources([Arc::new(users) as Arc<dyn MigrationSource>]).await;
//! let results = orchestrator.migrate().await;
//! if let Some(e) = results.combined_err() {
//!     eprintln!("{}: {}", results, e);
//! }
//! ```

pub mod memory;
mod orchestrator;
mod registry;
mod result;
pub mod sources;
mod types;

pub use memory::{AppliedUnit, ExecutedStatement, MemoryDatabase, MemoryEngine};
pub use orchestrator::Orchestrator;
pub use registry::Registry;
pub use result::{CombinedError, MigrationResult, ResultSet, SourceFailure};
pub use sources::{AssetSource, DirSource};
pub use types::{
    ExecOutcome, ExecRequest, MigrationDirection, MigrationEngine, MigrationError,
    MigrationSource, RegularizeError, Regularizer,
};
