//! Directory-backed migration source.

use super::scoped_id;
use crate::migration::types::{MigrationError, MigrationSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Extension of migration unit files
const UNIT_EXTENSION: &str = "sql";

/// A migration source reading `*.sql` files from a directory.
///
/// Unit ids are file paths relative to the root, using `/` as separator.
/// Only files directly inside the enumerated scope directory are units.
#[derive(Debug, Clone)]
pub struct DirSource {
    name: String,
    root: PathBuf,
}

impl DirSource {
    /// Create a source named after the directory's file name.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { name, root }
    }

    pub fn with_name(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unit_path(&self, unit_id: &str) -> Option<PathBuf> {
        // Ids never escape the root
        if unit_id.split('/').any(|part| part.is_empty() || part == "..") {
            return None;
        }
        Some(self.root.join(unit_id))
    }
}

#[async_trait]
impl MigrationSource for DirSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn unit_ids(&self, scope: &str) -> Result<Vec<String>, MigrationError> {
        let scope = scope.trim_matches('/');
        let dir = if scope.is_empty() {
            self.root.clone()
        } else {
            self.unit_path(scope)
                .ok_or_else(|| MigrationError::Enumeration {
                    scope: scope.to_string(),
                    message: "scope escapes the source directory".to_string(),
                })?
        };

        let mut ids = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| MigrationError::Enumeration {
                scope: scope.to_string(),
                message: e.to_string(),
            })?;

            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(UNIT_EXTENSION)
            {
                continue;
            }

            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                ids.push(scoped_id(scope, file_name));
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn unit_content(&self, unit_id: &str) -> Result<Vec<u8>, MigrationError> {
        let path = self
            .unit_path(unit_id)
            .filter(|p| p.is_file())
            .ok_or_else(|| MigrationError::UnitNotFound(unit_id.to_string()))?;

        Ok(fs::read(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_defaults_to_directory() {
        let source = DirSource::new("/srv/app/migrations/users");
        assert_eq!(source.name(), "users");
    }

    #[test]
    fn test_explicit_name() {
        let source = DirSource::with_name("/srv/app/migrations/users", "accounts");
        assert_eq!(source.name(), "accounts");
        assert_eq!(source.root(), Path::new("/srv/app/migrations/users"));
    }

    #[tokio::test]
    async fn test_rejects_escaping_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(temp_dir.path());

        let err = source.unit_content("../secret.sql").await.unwrap_err();
        assert!(matches!(err, MigrationError::UnitNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_root_fails_enumeration() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(temp_dir.path().join("absent"));

        let err = source.unit_ids("").await.unwrap_err();
        assert!(matches!(err, MigrationError::Enumeration { .. }));
    }
}
