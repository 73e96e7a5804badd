//! SQLite execution for relmap entities.
//!
//! This crate runs the statements derived by `relmap-core` against an
//! embedded SQLite database and materializes rows back into mapped types.
//!
//! # Architecture
//!
//! - **`executor`**: [`Executor`] runs schema DDL, CRUD specs and raw SQL,
//!   owns transaction wrapping and the statement trace.
//! - **`migration`**: schema version bookkeeping via `PRAGMA user_version`.
//! - **`config`**: [`SessionConfig`], loaded from YAML.
//! - **`session`**: [`Session`], the context object applications use.
//!
//! # Quick start
//!
//! ```no_run
//! use relmap_core::SchemaRegistry;
//! use relmap_sqlite::{Session, SessionConfig};
//!
//! let config = SessionConfig::load("relmap.yml").unwrap();
//! let registry = SchemaRegistry::new();
//! // registry.add::<MyType>()? for every mapped type
//! let session = Session::open(config, registry).unwrap();
//!
//! let raw = session.execute_raw("SELECT name FROM sqlite_master").unwrap();
//! for row in raw.rows {
//!     println!("{row:?}");
//! }
//! session.close().unwrap();
//! ```
//!
//! # Statement trace
//!
//! With `debug: true` every statement is logged at `DEBUG` level under the
//! `sqlop` target, for example:
//!
//! ```text
//! INSERT over players | values [name=abc score=1.5]
//! UPDATE over players | values [name=abd score=null] condition [id = ?] variables [ 1 ]
//! ```

mod config;
mod error;
mod executor;
mod migration;
mod session;

pub use config::{IN_MEMORY, SessionConfig};
pub use error::{Result, SqliteError};
pub use executor::{DdlReport, Executor, FAILED, RawRows, TRACE_TARGET};
pub use migration::{SchemaAction, SchemaStatus, apply_schema, existing_tables, user_version};
pub use session::Session;
