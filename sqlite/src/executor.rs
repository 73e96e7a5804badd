//! Statement execution against a SQLite connection.
//!
//! [`Executor`] runs the schema DDL of a [`SchemaRegistry`], executes
//! [`QuerySpec`]s and materializes result rows back into entity instances.
//!
//! # Failure reporting
//!
//! - Schema DDL is best-effort: a failing statement is logged and counted in
//!   the returned [`DdlReport`], and the remaining statements still run.
//! - An insert the engine rejects reports `-1` affected rows instead of an
//!   error. Nothing is written back to the object and the transaction is
//!   rolled back.
//! - Update and delete failures, and failures opening or committing a
//!   transaction, raise [`SqliteError::QueryExecutionFailed`].
//!
//! # Tracing
//!
//! With debug enabled every executed statement is logged at `DEBUG` under
//! the `sqlop` target, using [`QuerySpec::trace_line`] for CRUD operations
//! and the verbatim text for DDL and raw SQL.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use relmap_core::{
    Entity, FieldType, IDENTITY, MemberKind, MemberType, OrmError, QueryKind, QuerySpec,
    SchemaRegistry, Value, sql,
};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row, params_from_iter};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SqliteError};

/// Log target of the statement trace.
pub const TRACE_TARGET: &str = "sqlop";

/// Affected-row count reported for a failed insert.
pub const FAILED: i64 = -1;

/// Outcome of a best-effort DDL pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DdlReport {
    /// Statements the engine accepted.
    pub executed: usize,
    /// Statements that failed and were skipped.
    pub failed: usize,
}

impl DdlReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn merge(&mut self, other: DdlReport) {
        self.executed += other.executed;
        self.failed += other.failed;
    }
}

/// Rows returned by [`Executor::execute_raw`], every cell rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Runs schema hooks, CRUD specs and raw SQL on one connection.
pub struct Executor {
    conn: Connection,
    debug: AtomicBool,
}

impl Executor {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            debug: AtomicBool::new(false),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Turns the statement trace on or off.
    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Creates every registered table followed by its indexes.
    pub fn on_schema_create(&self, registry: &SchemaRegistry) -> DdlReport {
        let report = self.run_ddl(registry.create_statements());
        if !report.is_clean() {
            error!(failed = report.failed, "problem creating database schema");
        }
        report
    }

    /// Drops every registered table, then recreates the schema. Data in
    /// mapped tables is lost.
    pub fn on_schema_upgrade(
        &self,
        registry: &SchemaRegistry,
        old_version: i32,
        new_version: i32,
    ) -> DdlReport {
        info!(old_version, new_version, "upgrading database schema");
        let mut report = self.run_ddl(registry.drop_statements());
        if !report.is_clean() {
            error!(failed = report.failed, "problem upgrading database schema");
        }
        report.merge(self.on_schema_create(registry));
        report
    }

    fn run_ddl(&self, statements: Vec<String>) -> DdlReport {
        let mut report = DdlReport::default();
        for statement in statements {
            self.trace(&statement);
            match self.conn.execute_batch(&statement) {
                Ok(()) => report.executed += 1,
                Err(e) => {
                    error!(statement = %statement, error = %e, "schema statement failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Executes an insert, update or delete and returns the affected rows.
    ///
    /// An insert writes the assigned identity back onto the spec's object and
    /// reports 1, or reports [`FAILED`] when the engine rejects the row.
    /// Select specs are not executed here and also report [`FAILED`]. An
    /// update with no values to set reports 0 without touching the table.
    ///
    /// A transactional spec runs inside its own transaction, committed unless
    /// the result is [`FAILED`].
    ///
    /// # Errors
    ///
    /// - [`SqliteError::NestedTransaction`] when a transactional spec runs
    ///   while a transaction is already open.
    /// - [`SqliteError::QueryExecutionFailed`] for update/delete failures and
    ///   transaction boundary failures.
    /// - [`SqliteError::Orm`] when the assigned identity cannot be written
    ///   back; the insert is rolled back.
    pub fn execute_update(&self, spec: &mut QuerySpec<'_>) -> Result<i64> {
        if spec.is_transactional() && !self.conn.is_autocommit() {
            return Err(SqliteError::NestedTransaction);
        }

        let tx = if spec.is_transactional() {
            Some(self.conn.unchecked_transaction()?)
        } else {
            None
        };

        self.trace(&spec.trace_line());

        let rows = match spec.kind() {
            QueryKind::Insert => self.insert_row(spec)?,
            QueryKind::Update => self.update_rows(spec)?,
            QueryKind::Delete => self.delete_rows(spec)?,
            QueryKind::Select => {
                error!(table = spec.table(), "only insert, update and delete are supported");
                FAILED
            }
        };

        if let Some(tx) = tx {
            if rows == FAILED {
                tx.rollback()?;
            } else {
                tx.commit()?;
            }
        }
        Ok(rows)
    }

    fn insert_row(&self, spec: &mut QuerySpec<'_>) -> Result<i64> {
        let values = spec.values();
        let statement = sql::insert(spec.table(), &values.names());
        let inserted = self
            .conn
            .execute(&statement, params_from_iter(values.iter().map(|(_, v)| v)));

        if let Err(e) = inserted {
            warn!(table = spec.table(), error = %e, "insert rejected");
            return Ok(FAILED);
        }

        let rowid = self.conn.last_insert_rowid();
        let id = i32::try_from(rowid).map_err(|_| OrmError::AccessorInvocationFailure {
            field: IDENTITY.to_string(),
            reason: format!("assigned identity {rowid} does not fit i32"),
        })?;

        let entity = spec.entity().clone();
        if let (Some(field), Some(object)) = (entity.field(IDENTITY), spec.object_mut()) {
            if let Some(accessor) = &field.accessor {
                accessor.write(IDENTITY, object, Value::Int32(id))?;
            }
        }
        debug!(table = entity.table_name(), id, "inserted row");
        Ok(1)
    }

    fn update_rows(&self, spec: &QuerySpec<'_>) -> Result<i64> {
        let values = spec.values();
        // An identity-only entity has nothing to SET.
        if values.is_empty() {
            return Ok(0);
        }
        let statement = sql::update(spec.table(), &values.names(), spec.condition());
        let params = values
            .iter()
            .map(|(_, v)| v)
            .chain(spec.args().iter().map(|a| Some(a.as_str())));
        let rows = self.conn.execute(&statement, params_from_iter(params))?;
        Ok(rows as i64)
    }

    fn delete_rows(&self, spec: &QuerySpec<'_>) -> Result<i64> {
        let statement = sql::delete(spec.table(), spec.condition());
        let rows = self
            .conn
            .execute(&statement, params_from_iter(spec.args()))?;
        Ok(rows as i64)
    }

    /// Runs a select spec and materializes one default-constructed instance
    /// of the entity's type per row.
    ///
    /// Specs of any other kind return no rows. A `NULL` column leaves a
    /// non-optional member at its default value.
    ///
    /// # Errors
    ///
    /// [`SqliteError::QueryExecutionFailed`] when the read fails or a column
    /// does not decode as its member type; [`SqliteError::Orm`] when a member
    /// cannot be written.
    pub fn execute_query_entity(&self, spec: &QuerySpec<'_>) -> Result<Vec<Box<dyn Any>>> {
        if spec.kind() != QueryKind::Select {
            warn!(kind = %spec.kind(), table = spec.table(), "entity query ignored for non-select spec");
            return Ok(Vec::new());
        }

        let entity = spec.entity();
        let projection = sql::field_names_csv(entity.fields());
        let statement = sql::select(spec.table(), &projection, spec.condition());
        self.trace(&spec.trace_line());

        let mut stmt = self.conn.prepare(&statement)?;
        let mut rows = stmt.query(params_from_iter(spec.args()))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(materialize(entity, row)?);
        }
        Ok(results)
    }

    /// Number of rows in the entity's table.
    pub fn execute_count(&self, entity: &Entity) -> Result<i64> {
        let statement = sql::count(entity.table_name());
        self.trace(&statement);
        let count = self.conn.query_row(&statement, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Executes arbitrary SQL text with no parameter binding and returns
    /// every result row as text.
    ///
    /// The text is not validated or escaped in any way.
    pub fn execute_raw(&self, sql_text: &str) -> Result<RawRows> {
        self.trace(sql_text);
        let mut stmt = self.conn.prepare(sql_text).inspect_err(|e| {
            error!(error = %e, "executing sql");
        })?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut result = RawRows {
            columns,
            rows: Vec::new(),
        };
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(result.columns.len());
            for i in 0..result.columns.len() {
                cells.push(cell_text(row.get_ref(i)?));
            }
            result.rows.push(cells);
        }
        Ok(result)
    }

    fn trace(&self, line: &str) {
        if self.is_debug() {
            debug!(target: TRACE_TARGET, "{line}");
        }
    }
}

fn materialize(entity: &Entity, row: &Row<'_>) -> Result<Box<dyn Any>> {
    let mut object = entity.instantiate();
    for (idx, field) in entity.fields().iter().enumerate() {
        let value = read_column(row, idx, field.member)?;
        if value.is_null() && !field.member.optional {
            continue;
        }
        if let Some(accessor) = &field.accessor {
            accessor.write(&field.name, object.as_mut(), value)?;
        }
    }
    Ok(object)
}

/// Decodes one column as the member's type. The `Bool` and `Timestamp` arms
/// cover every [`MemberType`], although extraction currently rejects those
/// members before a row is ever read.
fn read_column(row: &Row<'_>, idx: usize, kind: MemberKind) -> rusqlite::Result<Value> {
    let value = match kind.ty {
        MemberType::Int32 => row.get::<_, Option<i32>>(idx)?.map(Value::Int32),
        MemberType::Int64 => row.get::<_, Option<i64>>(idx)?.map(Value::Int64),
        MemberType::Float32 => row.get::<_, Option<f32>>(idx)?.map(Value::Float32),
        MemberType::Float64 => row.get::<_, Option<f64>>(idx)?.map(Value::Float64),
        MemberType::Text => row.get::<_, Option<String>>(idx)?.map(Value::Text),
        MemberType::Bool => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
        MemberType::Timestamp => row
            .get::<_, Option<i64>>(idx)?
            .and_then(FieldType::decode_date)
            .map(Value::Timestamp),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn cell_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}
