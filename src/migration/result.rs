//! Outcomes of migrate and rollback runs.

use super::types::MigrationError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of running one migration source.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    name: String,
    applied: usize,
    error: Option<Arc<MigrationError>>,
}

impl MigrationResult {
    pub fn new(name: impl Into<String>, applied: usize, error: Option<MigrationError>) -> Self {
        Self {
            name: name.into(),
            applied,
            error: error.map(Arc::new),
        }
    }

    /// Name of the source that produced this result.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of units applied (or reverted) by this run.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// The error of this run, `None` on success.
    pub fn err(&self) -> Option<&MigrationError> {
        self.error.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for MigrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "-unnamed-"
        } else {
            &self.name
        };
        write!(f, "{} ({})", name, self.applied)
    }
}

/// A failed source together with its error.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: String,
    pub error: Arc<MigrationError>,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Every per-source failure of one run, in source order.
#[derive(Error, Debug, Clone)]
#[error("{}", join_failures(.failures))]
pub struct CombinedError {
    failures: Vec<SourceFailure>,
}

impl CombinedError {
    pub fn failures(&self) -> &[SourceFailure] {
        &self.failures
    }

    /// Names of the sources that failed.
    pub fn sources(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.source.as_str()).collect()
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Results of one migrate or rollback call, in source registration order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    results: Vec<MigrationResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: MigrationResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MigrationResult> {
        self.results.iter()
    }

    /// First result produced by a source with the given name.
    pub fn get(&self, name: &str) -> Option<&MigrationResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Sum of applied counts, failed results included.
    pub fn total(&self) -> usize {
        self.results.iter().map(|r| r.applied).sum()
    }

    pub fn has_error(&self) -> bool {
        self.results.iter().any(|r| r.error.is_some())
    }

    /// Errors of the failed results, in source order.
    pub fn errs(&self) -> Vec<&MigrationError> {
        self.results.iter().filter_map(|r| r.err()).collect()
    }

    pub fn failures(&self) -> Vec<SourceFailure> {
        self.results
            .iter()
            .filter_map(|r| {
                r.error.as_ref().map(|e| SourceFailure {
                    source: r.name.clone(),
                    error: Arc::clone(e),
                })
            })
            .collect()
    }

    /// All failures folded into one error, `None` if every source succeeded.
    pub fn combined_err(&self) -> Option<CombinedError> {
        let failures = self.failures();
        if failures.is_empty() {
            None
        } else {
            Some(CombinedError { failures })
        }
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listed = self
            .results
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if listed.is_empty() {
            write!(f, "total: {}", self.total())
        } else {
            write!(f, "{} - total: {}", listed, self.total())
        }
    }
}

impl FromIterator<MigrationResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = MigrationResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResultSet {
    type Item = MigrationResult;
    type IntoIter = std::vec::IntoIter<MigrationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a MigrationResult;
    type IntoIter = std::slice::Iter<'a, MigrationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
