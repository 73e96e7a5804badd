//! Error types for statement execution and session management.
//!
//! Wraps mapping errors from `relmap-core`, engine failures from SQLite, and
//! configuration problems into one error type.

use relmap_core::OrmError;
use thiserror::Error;

/// Errors that can occur while executing entity operations on SQLite.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Schema derivation, serialization or accessor failure.
    #[error(transparent)]
    Orm(#[from] OrmError),

    /// The engine rejected a statement or a transaction boundary.
    #[error("query execution failed: {0}")]
    QueryExecutionFailed(#[from] rusqlite::Error),

    /// A transactional operation ran while another transaction was open.
    #[error("a transaction is already open on this connection")]
    NestedTransaction,

    /// The database file was written by a newer schema version.
    #[error("database schema version {db_version} is newer than requested version {requested}")]
    UnsupportedSchemaVersion { db_version: i32, requested: i32 },

    /// Invalid session configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration YAML could not be parsed or written.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
