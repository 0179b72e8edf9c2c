use crate::utils::{DEFAULT_DIALECT, DEFAULT_TABLE_PREFIX, ROOT_SCOPE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

/// sqlmig configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlMigConfig {
    /// Prefix of every source's bookkeeping table (`<prefix>_<source>`).
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Driver/dialect identifier handed to the migration engine.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Scope passed to each source's unit enumerator. Empty means the root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

impl Default for SqlMigConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            dialect: default_dialect(),
            scope: ROOT_SCOPE.to_string(),
        }
    }
}

/// Read the configuration file, `None` if it does not exist
pub async fn read_config(config_path: &Path) -> Result<Option<SqlMigConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path).await?;
    let config: SqlMigConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &SqlMigConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}
