//! Session configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! database: app.db
//! version: 2
//! debug: false
//! entities:
//!   - players
//!   - teams
//! ```
//!
//! `database` may be `:memory:` for a private in-memory database. When
//! `entities` is non-empty, every listed table must be registered before a
//! session opens.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqliteError};

/// Database name reserved for an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

fn default_version() -> i32 {
    1
}

/// Settings for opening a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Database file path, or `:memory:`.
    pub database: String,
    /// Schema version, at least 1.
    #[serde(default = "default_version")]
    pub version: i32,
    /// Trace every executed statement.
    #[serde(default)]
    pub debug: bool,
    /// Table names that must be registered when the session opens.
    #[serde(default)]
    pub entities: Vec<String>,
}

impl SessionConfig {
    pub fn new(database: impl Into<String>, version: i32) -> Self {
        Self {
            database: database.into(),
            version,
            debug: false,
            entities: Vec::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY, 1)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    /// Loads configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Io`] if the file cannot be read,
    /// [`SqliteError::Yaml`] if parsing fails, or [`SqliteError::Config`] if
    /// the values are invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks the database name and version.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(SqliteError::Config("database name is empty".to_string()));
        }
        if self.version < 1 {
            return Err(SqliteError::Config(format!(
                "schema version must be at least 1, got {}",
                self.version
            )));
        }
        if let Some(empty) = self.entities.iter().position(|e| e.trim().is_empty()) {
            return Err(SqliteError::Config(format!("entity #{empty} has an empty name")));
        }
        Ok(())
    }
}
