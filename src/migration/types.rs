//! Types for the migration system.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error types for running a single migration source.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cannot find data {0:?}")]
    UnitNotFound(String),

    #[error("Failed to enumerate units in scope {scope:?}: {message}")]
    Enumeration { scope: String, message: String },

    #[error("Migration {unit} failed: {message}")]
    Execution { unit: String, message: String },

    #[error("Bookkeeping table {table} unavailable: {message}")]
    Bookkeeping { table: String, message: String },

    #[error("Unit {0} is not valid UTF-8")]
    InvalidContent(String),

    #[error("Bookkeeping table name {0:?} cannot be used")]
    InvalidNamespace(String),

    #[error("Namespace {0} is already used by another source in this run")]
    DuplicateNamespace(String),
}

/// Error types for regularization.
#[derive(Error, Debug)]
pub enum RegularizeError {
    #[error("Regularizer {regularizer} failed: {message}")]
    Failed { regularizer: String, message: String },

    #[error("Regularization cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply units in enumeration order.
    Up,
    /// Revert units in reverse enumeration order.
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// A named, independently-versioned collection of migration units.
///
/// The order of `unit_ids` is the application order for forward runs and,
/// reversed, the revert order for backward runs. Every id it returns must be
/// resolvable by `unit_content`.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Name of the source, used for its version-tracking namespace and
    /// for reporting. May be empty.
    fn name(&self) -> &str;

    /// Ordered unit ids under `scope` (the empty scope is the source root).
    async fn unit_ids(&self, scope: &str) -> Result<Vec<String>, MigrationError>;

    /// Raw content of a unit.
    async fn unit_content(&self, unit_id: &str) -> Result<Vec<u8>, MigrationError>;
}

/// A post-migration fix-up step.
///
/// Regularizers run after migrations in registration order. A later
/// regularizer may assume every earlier one succeeded.
#[async_trait]
pub trait Regularizer: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn regularize(&self, ctx: &CancellationToken) -> Result<(), RegularizeError>;
}

/// One engine invocation: a single source in a single direction.
pub struct ExecRequest<'a> {
    /// Driver/dialect identifier the engine should generate bookkeeping for.
    pub dialect: &'a str,
    /// Version-tracking namespace (bookkeeping table) of the source.
    pub table: &'a str,
    /// Scope passed to the source's enumerator.
    pub scope: &'a str,
    pub source: &'a dyn MigrationSource,
    pub direction: MigrationDirection,
}

/// Outcome of one engine invocation.
///
/// `applied` counts units newly applied (or reverted) before the run ended,
/// so a failed run may still report a partial count.
#[derive(Debug, Default)]
pub struct ExecOutcome {
    pub applied: usize,
    pub error: Option<MigrationError>,
}

impl ExecOutcome {
    pub fn ok(applied: usize) -> Self {
        Self {
            applied,
            error: None,
        }
    }

    pub fn failed(applied: usize, error: MigrationError) -> Self {
        Self {
            applied,
            error: Some(error),
        }
    }
}

/// The migration execution engine.
///
/// Given a database handle and a source, the engine applies or reverts the
/// source's units, recording applied units in the request's bookkeeping
/// table. Units already recorded as applied are skipped on forward runs.
#[async_trait]
pub trait MigrationEngine<D: ?Sized>: Send + Sync {
    async fn exec(&self, db: &D, request: ExecRequest<'_>) -> ExecOutcome;
}
