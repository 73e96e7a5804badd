//! Schema version bookkeeping through `PRAGMA user_version`.
//!
//! The database file records the schema version it was built for. Opening it
//! with a requested version decides what happens to the mapped tables:
//!
//! | stored version      | action                                   |
//! |---------------------|------------------------------------------|
//! | 0 (new database)    | create every table and index             |
//! | lower than request  | drop every mapped table, then create     |
//! | equal               | nothing                                  |
//! | higher than request | [`SqliteError::UnsupportedSchemaVersion`] |
//!
//! The DDL and the version bump run in one transaction.

use relmap_core::SchemaRegistry;
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, SqliteError};
use crate::executor::{DdlReport, Executor};

/// What [`apply_schema`] did to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    Created,
    Upgraded { from: i32, to: i32 },
    UpToDate,
}

/// Result of [`apply_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub action: SchemaAction,
    /// Version stored in the database afterwards.
    pub version: i32,
    /// Outcome of the DDL statements, empty when nothing ran.
    pub ddl: DdlReport,
}

/// Reads the schema version stored in the database header.
pub fn user_version(conn: &Connection) -> Result<i32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, i32>(0))?;
    Ok(version)
}

/// Brings the database to schema `version` for the registered entities.
///
/// # Errors
///
/// - [`SqliteError::Config`] when `version` is not positive.
/// - [`SqliteError::UnsupportedSchemaVersion`] when the database is newer.
/// - [`SqliteError::NestedTransaction`] when a transaction is already open.
/// - [`SqliteError::QueryExecutionFailed`] when the version cannot be read or
///   written. Individual DDL failures are only reported in the status.
pub fn apply_schema(executor: &Executor, registry: &SchemaRegistry, version: i32) -> Result<SchemaStatus> {
    if version < 1 {
        return Err(SqliteError::Config(format!(
            "schema version must be at least 1, got {version}"
        )));
    }

    let conn = executor.connection();
    let current = user_version(conn)?;
    if current > version {
        return Err(SqliteError::UnsupportedSchemaVersion {
            db_version: current,
            requested: version,
        });
    }
    if current == version {
        return Ok(SchemaStatus {
            action: SchemaAction::UpToDate,
            version,
            ddl: DdlReport::default(),
        });
    }
    if !conn.is_autocommit() {
        return Err(SqliteError::NestedTransaction);
    }

    let tx = conn.unchecked_transaction()?;
    let (action, ddl) = if current == 0 {
        (SchemaAction::Created, executor.on_schema_create(registry))
    } else {
        (
            SchemaAction::Upgraded {
                from: current,
                to: version,
            },
            executor.on_schema_upgrade(registry, current, version),
        )
    };
    tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    tx.commit()?;

    info!(?action, version, executed = ddl.executed, failed = ddl.failed, "schema applied");
    Ok(SchemaStatus { action, version, ddl })
}

/// Names of the user tables in the database, sorted.
pub fn existing_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{Column, Mapped, Member, Table, TypeDescriptor};

    #[derive(Default)]
    struct Tag {
        id: i32,
        label: String,
    }

    impl Mapped for Tag {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::of()
                .table(Table::named("tags"))
                .member(
                    Member::new("id", |t: &Tag| t.id, |t: &mut Tag, v| t.id = v)
                        .column(Column::new().primary()),
                )
                .member(
                    Member::new("label", |t: &Tag| t.label.clone(), |t: &mut Tag, v| t.label = v)
                        .column(Column::new().not_null().index()),
                )
        }
    }

    fn setup() -> (Executor, SchemaRegistry) {
        let registry = SchemaRegistry::new();
        registry.add::<Tag>().unwrap();
        (Executor::open_in_memory().unwrap(), registry)
    }

    #[test]
    fn test_fresh_database_is_created() {
        let (executor, registry) = setup();
        assert_eq!(user_version(executor.connection()).unwrap(), 0);

        let status = apply_schema(&executor, &registry, 1).unwrap();
        assert_eq!(status.action, SchemaAction::Created);
        assert_eq!(status.ddl, DdlReport { executed: 2, failed: 0 });
        assert_eq!(user_version(executor.connection()).unwrap(), 1);
        assert_eq!(existing_tables(executor.connection()).unwrap(), vec!["tags"]);
    }

    #[test]
    fn test_same_version_is_untouched() {
        let (executor, registry) = setup();
        apply_schema(&executor, &registry, 2).unwrap();
        let status = apply_schema(&executor, &registry, 2).unwrap();
        assert_eq!(status.action, SchemaAction::UpToDate);
        assert_eq!(status.ddl, DdlReport::default());
    }

    #[test]
    fn test_upgrade_drops_and_recreates() {
        let (executor, registry) = setup();
        apply_schema(&executor, &registry, 1).unwrap();
        executor
            .connection()
            .execute("INSERT INTO tags(label) VALUES ('kept?')", [])
            .unwrap();

        let status = apply_schema(&executor, &registry, 3).unwrap();
        assert_eq!(status.action, SchemaAction::Upgraded { from: 1, to: 3 });
        assert_eq!(user_version(executor.connection()).unwrap(), 3);

        let rows: i64 = executor
            .connection()
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let (executor, registry) = setup();
        executor
            .connection()
            .execute_batch("PRAGMA user_version = 9;")
            .unwrap();
        let err = apply_schema(&executor, &registry, 2).unwrap_err();
        assert!(matches!(
            err,
            SqliteError::UnsupportedSchemaVersion {
                db_version: 9,
                requested: 2
            }
        ));
    }

    #[test]
    fn test_version_must_be_positive() {
        let (executor, registry) = setup();
        assert!(matches!(
            apply_schema(&executor, &registry, 0),
            Err(SqliteError::Config(_))
        ));
    }
}
