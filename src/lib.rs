pub mod config;
pub mod migration;
pub mod utils;

// Re-export commonly used types
pub use config::{read_config, write_config, ConfigError, SqlMigConfig};
pub use migration::{
    AssetSource, CombinedError, DirSource, ExecOutcome, ExecRequest, MemoryDatabase,
    MemoryEngine, MigrationDirection, MigrationEngine, MigrationError, MigrationResult,
    MigrationSource, Orchestrator, RegularizeError, Regularizer, ResultSet, SourceFailure,
};
pub use tokio_util::sync::CancellationToken;
