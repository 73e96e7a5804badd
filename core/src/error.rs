//! Error types for metadata extraction, registration and query construction.
//!
//! Every failure the mapping core can report is a variant of [`OrmError`].
//! Schema-derivation errors are fatal to the registration call that raised
//! them; serialization and accessor errors surface while a
//! [`QuerySpec`](crate::QuerySpec) is being built or materialized.

use thiserror::Error;

/// Errors raised by the mapping core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrmError {
    /// The type descriptor carries no table marker.
    #[error("type {0} has no table marker")]
    EntityNotMapped(String),

    /// The primary member is not a plain 32-bit signed integer, or a field
    /// named `id` is not an integer primary key.
    #[error("primary key `{member}` must be a non-optional i32 INTEGER column, found {found}")]
    InvalidPrimaryKeyType { member: String, found: String },

    /// The member's underlying type has no column mapping.
    #[error("member `{member}` has unsupported data type {found}")]
    UnsupportedFieldType { member: String, found: String },

    /// A column marked nullable sits on a fixed-size numeric member.
    #[error("member `{0}` is a primitive and cannot be nullable")]
    NullablePrimitiveConflict(String),

    /// A default value does not parse as the numeric column type.
    #[error("invalid default value `{value}` for numeric member `{member}`")]
    InvalidDefaultValue { member: String, value: String },

    /// Extraction finished without an `id` primary key.
    #[error("type {0} has no primary key `id`")]
    MissingPrimaryKey(String),

    /// A second primary key, or a primary key on a field other than `id`.
    #[error("only one field named `id` can be primary key, rejected `{0}`")]
    DuplicatePrimaryKeyDeclaration(String),

    /// Empty or duplicate field name.
    #[error("invalid field name: {0}")]
    InvalidFieldName(String),

    /// A non-nullable member produced no value during serialization.
    #[error("field {field} in table {table} can't be null")]
    RequiredFieldNull { field: String, table: String },

    /// Reading or writing a member through its accessor failed.
    #[error("accessor for field `{field}` failed: {reason}")]
    AccessorInvocationFailure { field: String, reason: String },

    /// The operation targets a type that was never registered.
    #[error("type {0} is not registered")]
    EntityNotRegistered(String),

    /// A field-set violation, tagged with the entity it happened in.
    #[error("in entity {table}: {source}")]
    InEntity {
        table: String,
        #[source]
        source: Box<OrmError>,
    },
}

impl OrmError {
    /// Returns the innermost error, looking through [`OrmError::InEntity`].
    ///
    /// ```
    /// use relmap_core::OrmError;
    ///
    /// let err = OrmError::InEntity {
    ///     table: "Player".into(),
    ///     source: Box::new(OrmError::InvalidFieldName("empty field name".into())),
    /// };
    /// assert!(matches!(err.root(), OrmError::InvalidFieldName(_)));
    /// ```
    pub fn root(&self) -> &OrmError {
        match self {
            Self::InEntity { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn accessor(field: &str, reason: impl Into<String>) -> Self {
        Self::AccessorInvocationFailure {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results with [`OrmError`].
pub type Result<T> = std::result::Result<T, OrmError>;
