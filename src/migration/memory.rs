//! In-process database and reference migration engine.
//!
//! `MemoryDatabase` keeps per-namespace bookkeeping and a log of executed
//! unit content. `MemoryEngine` implements the engine contract on top of it:
//! each unit is applied and recorded atomically, so a failure leaves the
//! units before it applied. Faults can be injected per unit or per
//! bookkeeping table.

use super::types::{
    ExecOutcome, ExecRequest, MigrationDirection, MigrationEngine, MigrationError,
};
use crate::utils::is_quotable_identifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A unit recorded as applied in a bookkeeping table.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUnit {
    pub id: String,
    pub applied_at: DateTime<Utc>,
}

/// Unit content executed against the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub table: String,
    pub unit: String,
    pub direction: MigrationDirection,
    pub sql: String,
}

#[derive(Default)]
struct DatabaseState {
    tables: HashMap<String, Vec<AppliedUnit>>,
    executed: Vec<ExecutedStatement>,
    failing_units: HashSet<String>,
    failing_tables: HashSet<String>,
}

/// An in-process database handle.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<DatabaseState>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every execution of `unit_id` fail, in either direction.
    pub async fn fail_unit(&self, unit_id: impl Into<String>) {
        self.state.lock().await.failing_units.insert(unit_id.into());
    }

    /// Make creating or using the bookkeeping table `table` fail.
    pub async fn fail_table(&self, table: impl Into<String>) {
        self.state.lock().await.failing_tables.insert(table.into());
    }

    /// Clear all injected faults.
    pub async fn heal(&self) {
        let mut state = self.state.lock().await;
        state.failing_units.clear();
        state.failing_tables.clear();
    }

    /// Names of every bookkeeping table created so far, sorted.
    pub async fn tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.state.lock().await.tables.keys().cloned().collect();
        tables.sort();
        tables
    }

    /// Units recorded in a bookkeeping table, in application order.
    pub async fn applied(&self, table: &str) -> Vec<AppliedUnit> {
        self.state
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn applied_ids(&self, table: &str) -> Vec<String> {
        self.applied(table).await.into_iter().map(|u| u.id).collect()
    }

    /// Every statement executed so far, in execution order.
    pub async fn executed(&self) -> Vec<ExecutedStatement> {
        self.state.lock().await.executed.clone()
    }

    async fn ensure_table(&self, table: &str) -> Result<(), MigrationError> {
        if !is_quotable_identifier(table) {
            return Err(MigrationError::InvalidNamespace(table.to_string()));
        }

        let mut state = self.state.lock().await;
        if state.failing_tables.contains(table) {
            return Err(MigrationError::Bookkeeping {
                table: table.to_string(),
                message: "cannot create table".to_string(),
            });
        }
        state.tables.entry(table.to_string()).or_default();
        Ok(())
    }

    /// Execute one unit and update the bookkeeping table in one step.
    async fn apply(
        &self,
        table: &str,
        unit: &str,
        direction: MigrationDirection,
        sql: String,
    ) -> Result<(), MigrationError> {
        let mut state = self.state.lock().await;
        if state.failing_units.contains(unit) {
            return Err(MigrationError::Execution {
                unit: unit.to_string(),
                message: format!("statement failed while migrating {}", direction),
            });
        }

        let applied = state.tables.entry(table.to_string()).or_default();
        match direction {
            MigrationDirection::Up => applied.push(AppliedUnit {
                id: unit.to_string(),
                applied_at: Utc::now(),
            }),
            MigrationDirection::Down => applied.retain(|u| u.id != unit),
        }

        state.executed.push(ExecutedStatement {
            table: table.to_string(),
            unit: unit.to_string(),
            direction,
            sql,
        });
        Ok(())
    }
}

/// Reference engine for `MemoryDatabase`.
///
/// Forward runs apply units not yet recorded, in enumeration order. Backward
/// runs revert recorded units in reverse enumeration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryEngine;

impl MemoryEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MigrationEngine<MemoryDatabase> for MemoryEngine {
    async fn exec(&self, db: &MemoryDatabase, request: ExecRequest<'_>) -> ExecOutcome {
        let ExecRequest {
            dialect,
            table,
            scope,
            source,
            direction,
        } = request;

        if let Err(e) = db.ensure_table(table).await {
            return ExecOutcome::failed(0, e);
        }

        let ids = match source.unit_ids(scope).await {
            Ok(ids) => ids,
            Err(e) => return ExecOutcome::failed(0, e),
        };

        let recorded: HashSet<String> = db.applied_ids(table).await.into_iter().collect();
        let pending: Vec<&String> = match direction {
            MigrationDirection::Up => ids.iter().filter(|id| !recorded.contains(*id)).collect(),
            MigrationDirection::Down => ids
                .iter()
                .rev()
                .filter(|id| recorded.contains(*id))
                .collect(),
        };

        debug!(
            table,
            dialect,
            %direction,
            units = ids.len(),
            pending = pending.len(),
            "Executing source"
        );

        let mut applied = 0;
        for id in pending {
            let content = match source.unit_content(id).await {
                Ok(content) => content,
                Err(e) => return ExecOutcome::failed(applied, e),
            };

            let sql = match String::from_utf8(content) {
                Ok(sql) => sql,
                Err(_) => {
                    return ExecOutcome::failed(applied, MigrationError::InvalidContent(id.clone()))
                }
            };

            if let Err(e) = db.apply(table, id, direction, sql).await {
                warn!(table, unit = %id, error = %e, "Unit failed");
                return ExecOutcome::failed(applied, e);
            }
            applied += 1;
        }

        ExecOutcome::ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::sources::AssetSource;

    fn request<'a>(source: &'a AssetSource, direction: MigrationDirection) -> ExecRequest<'a> {
        ExecRequest {
            dialect: "postgres",
            table: "mig_users",
            scope: "",
            source,
            direction,
        }
    }

    fn users() -> AssetSource {
        AssetSource::new("users")
            .with_unit("1_create.sql", "CREATE TABLE users (id INT)")
            .with_unit("2_email.sql", "ALTER TABLE users ADD email TEXT")
    }

    #[tokio::test]
    async fn test_forward_applies_in_order() {
        let db = MemoryDatabase::new();
        let source = users();

        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;
        assert_eq!(outcome.applied, 2);
        assert!(outcome.error.is_none());
        assert_eq!(db.applied_ids("mig_users").await, vec!["1_create.sql", "2_email.sql"]);

        let executed = db.executed().await;
        assert_eq!(executed[0].sql, "CREATE TABLE users (id INT)");
        assert_eq!(executed[1].unit, "2_email.sql");
    }

    #[tokio::test]
    async fn test_forward_skips_applied_units() {
        let db = MemoryDatabase::new();
        let source = users();
        MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;

        let source = users().with_unit("3_index.sql", "CREATE INDEX users_email ON users (email)");
        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;
        assert_eq!(outcome.applied, 1);
        assert_eq!(db.applied_ids("mig_users").await.len(), 3);
    }

    #[tokio::test]
    async fn test_backward_reverts_in_reverse_order() {
        let db = MemoryDatabase::new();
        let source = users();
        MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;

        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Down)).await;
        assert_eq!(outcome.applied, 2);
        assert!(db.applied_ids("mig_users").await.is_empty());

        let reverted: Vec<String> = db
            .executed()
            .await
            .into_iter()
            .filter(|s| s.direction == MigrationDirection::Down)
            .map(|s| s.unit)
            .collect();
        assert_eq!(reverted, vec!["2_email.sql", "1_create.sql"]);
    }

    #[tokio::test]
    async fn test_backward_with_nothing_applied() {
        let db = MemoryDatabase::new();
        let source = users();

        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Down)).await;
        assert_eq!(outcome.applied, 0);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_units() {
        let db = MemoryDatabase::new();
        db.fail_unit("2_email.sql").await;
        let source = users();

        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;
        assert_eq!(outcome.applied, 1);
        assert!(matches!(outcome.error, Some(MigrationError::Execution { .. })));
        assert_eq!(db.applied_ids("mig_users").await, vec!["1_create.sql"]);
    }

    #[tokio::test]
    async fn test_bookkeeping_failure() {
        let db = MemoryDatabase::new();
        db.fail_table("mig_users").await;
        let source = users();

        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;
        assert_eq!(outcome.applied, 0);
        assert!(matches!(outcome.error, Some(MigrationError::Bookkeeping { .. })));
        assert!(db.tables().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_content() {
        let db = MemoryDatabase::new();
        let source = AssetSource::new("users").with_unit("1.sql", vec![0xff, 0xfe]);

        let outcome = MemoryEngine.exec(&db, request(&source, MigrationDirection::Up)).await;
        assert_eq!(outcome.applied, 0);
        assert!(matches!(
            outcome.error,
            Some(MigrationError::InvalidContent(ref id)) if id == "1.sql"
        ));
    }

    #[tokio::test]
    async fn test_table_name_with_punctuation() {
        let db = MemoryDatabase::new();
        let source = users();
        let request = ExecRequest {
            table: "schema-versions_users.v2",
            ..request(&source, MigrationDirection::Up)
        };

        let outcome = MemoryEngine.exec(&db, request).await;
        assert_eq!(outcome.applied, 2);
        assert!(outcome.error.is_none());
        assert_eq!(db.tables().await, vec!["schema-versions_users.v2"]);
    }

    #[tokio::test]
    async fn test_unquotable_table_name() {
        let db = MemoryDatabase::new();
        let source = users();
        let request = ExecRequest {
            table: "mig_\"users",
            ..request(&source, MigrationDirection::Up)
        };

        let outcome = MemoryEngine.exec(&db, request).await;
        assert_eq!(outcome.applied, 0);
        assert!(matches!(outcome.error, Some(MigrationError::InvalidNamespace(_))));
        assert!(db.tables().await.is_empty());
    }
}
