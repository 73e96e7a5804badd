//! The context object applications work through.
//!
//! A [`Session`] owns the connection, the executor and the registry of mapped
//! types. Opening it applies the schema for the configured version; closing
//! it releases the registered metadata.
//!
//! # Example
//!
//! ```
//! use relmap_core::{Column, DeleteTarget, Mapped, Member, SchemaRegistry, Table, TypeDescriptor};
//! use relmap_sqlite::{Session, SessionConfig};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Player {
//!     id: i32,
//!     name: String,
//!     score: Option<f64>,
//! }
//!
//! impl Mapped for Player {
//!     fn describe() -> TypeDescriptor<Self> {
//!         TypeDescriptor::of()
//!             .table(Table::named("players"))
//!             .member(
//!                 Member::new("id", |p: &Player| p.id, |p: &mut Player, v| p.id = v)
//!                     .column(Column::new().primary()),
//!             )
//!             .member(
//!                 Member::new("name", |p: &Player| p.name.clone(), |p: &mut Player, v| p.name = v)
//!                     .column(Column::new().not_null()),
//!             )
//!             .member(
//!                 Member::new("score", |p: &Player| p.score, |p: &mut Player, v| p.score = v)
//!                     .column(Column::new()),
//!             )
//!     }
//! }
//!
//! let registry = SchemaRegistry::new();
//! registry.add::<Player>().unwrap();
//! let session = Session::open(SessionConfig::in_memory(), registry).unwrap();
//!
//! let mut player = Player { name: "abc".into(), score: Some(1.5), ..Default::default() };
//! session.insert(&mut player).unwrap();
//! assert!(player.id > 0);
//!
//! let found = session.find::<Player>(player.id).unwrap();
//! assert_eq!(found.as_ref(), Some(&player));
//!
//! assert_eq!(session.delete::<Player>(DeleteTarget::All).unwrap(), 1);
//! session.close().unwrap();
//! ```

use std::any::{Any, type_name};
use std::sync::Arc;

use relmap_core::{
    DeleteTarget, Entity, IDENTITY_CONDITION, Mapped, OrmError, QuerySpec, SchemaRegistry,
};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SqliteError};
use crate::executor::{Executor, RawRows};
use crate::migration::{SchemaStatus, apply_schema};

/// An open database bound to a registry of mapped types.
pub struct Session {
    config: SessionConfig,
    registry: Arc<SchemaRegistry>,
    executor: Executor,
    status: SchemaStatus,
}

impl Session {
    /// Opens the configured database and brings its schema to the configured
    /// version.
    ///
    /// # Errors
    ///
    /// - [`SqliteError::Config`] for an invalid configuration or a configured
    ///   entity that is not registered.
    /// - [`SqliteError::UnsupportedSchemaVersion`] when the file is newer.
    /// - [`SqliteError::QueryExecutionFailed`] when the database cannot be
    ///   opened.
    pub fn open(config: SessionConfig, registry: impl Into<Arc<SchemaRegistry>>) -> Result<Self> {
        config.validate()?;
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.database)?
        };
        Self::open_with_connection(config, registry, conn)
    }

    /// Like [`Session::open`], over a connection the caller already opened.
    /// `config.database` is only used for diagnostics.
    pub fn open_with_connection(
        config: SessionConfig,
        registry: impl Into<Arc<SchemaRegistry>>,
        conn: Connection,
    ) -> Result<Self> {
        config.validate()?;
        let registry = registry.into();

        let missing: Vec<&str> = config
            .entities
            .iter()
            .map(String::as_str)
            .filter(|table| registry.find_table(table).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SqliteError::Config(format!(
                "configured entities are not registered: {}",
                missing.join(", ")
            )));
        }

        let executor = Executor::new(conn);
        executor.set_debug(config.debug);
        let status = apply_schema(&executor, &registry, config.version)?;

        info!(
            database = %config.database,
            version = config.version,
            entities = registry.len(),
            "session opened"
        );
        Ok(Self {
            config,
            registry,
            executor,
            status,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// What opening the session did to the schema.
    pub fn schema_status(&self) -> SchemaStatus {
        self.status
    }

    /// The registered entity for `T`.
    ///
    /// # Errors
    ///
    /// [`OrmError::EntityNotRegistered`] when `T` was never registered.
    pub fn entity<T: Mapped>(&self) -> Result<Arc<Entity>> {
        self.registry
            .get_entity::<T>()
            .ok_or_else(|| OrmError::EntityNotRegistered(type_name::<T>().to_string()).into())
    }

    /// Inserts `object` and writes the assigned identity onto it.
    ///
    /// Returns 1, or -1 when the engine rejected the row.
    pub fn insert<T: Mapped>(&self, object: &mut T) -> Result<i64> {
        let mut spec = QuerySpec::insert(self.entity::<T>()?, object)?;
        self.executor.execute_update(&mut spec)
    }

    /// Updates the row with `object`'s identity; returns the affected rows.
    pub fn update<T: Mapped>(&self, object: &T) -> Result<i64> {
        let mut spec = QuerySpec::update(self.entity::<T>()?, object)?;
        self.executor.execute_update(&mut spec)
    }

    /// Deletes one row or all of them; returns the affected rows.
    pub fn delete<T: Mapped>(&self, target: DeleteTarget) -> Result<i64> {
        let mut spec = QuerySpec::delete(self.entity::<T>()?, target);
        self.executor.execute_update(&mut spec)
    }

    /// Rows of `T` matching `condition`, with `?` placeholders bound to
    /// `args` in order.
    pub fn select_where<T: Mapped>(
        &self,
        condition: &str,
        args: impl IntoIterator<Item = impl ToString>,
    ) -> Result<Vec<T>> {
        let args = args.into_iter().map(|a| a.to_string()).collect();
        let spec = QuerySpec::select_where(self.entity::<T>()?, condition, args);
        self.materialize(&spec)
    }

    pub fn select_all<T: Mapped>(&self) -> Result<Vec<T>> {
        let spec = QuerySpec::select(self.entity::<T>()?);
        self.materialize(&spec)
    }

    /// The row of `T` with identity `id`.
    pub fn find<T: Mapped>(&self, id: i32) -> Result<Option<T>> {
        Ok(self
            .select_where::<T>(IDENTITY_CONDITION, [id])?
            .into_iter()
            .next())
    }

    pub fn count<T: Mapped>(&self) -> Result<i64> {
        let entity = self.entity::<T>()?;
        self.executor.execute_count(&entity)
    }

    /// Runs a prepared spec through the executor.
    pub fn execute(&self, spec: &mut QuerySpec<'_>) -> Result<i64> {
        self.executor.execute_update(spec)
    }

    /// Runs a select spec and returns the type-erased objects.
    pub fn query(&self, spec: &QuerySpec<'_>) -> Result<Vec<Box<dyn Any>>> {
        self.executor.execute_query_entity(spec)
    }

    /// Executes SQL text as-is. See [`Executor::execute_raw`].
    pub fn execute_raw(&self, sql_text: &str) -> Result<RawRows> {
        self.executor.execute_raw(sql_text)
    }

    /// Clears the registry and closes the connection.
    pub fn close(self) -> Result<()> {
        self.registry.clear();
        self.executor
            .into_connection()
            .close()
            .map_err(|(_, e)| SqliteError::QueryExecutionFailed(e))?;
        debug!(database = %self.config.database, "session closed");
        Ok(())
    }

    fn materialize<T: Mapped>(&self, spec: &QuerySpec<'_>) -> Result<Vec<T>> {
        self.executor
            .execute_query_entity(spec)?
            .into_iter()
            .map(|object| {
                object.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
                    SqliteError::Orm(OrmError::AccessorInvocationFailure {
                        field: spec.table().to_string(),
                        reason: format!("materialized row is not a {}", type_name::<T>()),
                    })
                })
            })
            .collect()
    }
}
