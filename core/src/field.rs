//! Column descriptors and the ordered field collection of an entity.

use std::fmt;

use crate::descriptor::Accessor;
use crate::error::{OrmError, Result};
use crate::types::{FieldType, MemberKind, MemberType};

/// Name of the single primary-key column every entity carries.
pub const IDENTITY: &str = "id";

/// Schema attributes of one column.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub primary: bool,
    pub unique: bool,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub index: bool,
    pub asc_order: bool,
    pub member: MemberKind,
    pub accessor: Option<Accessor>,
}

impl Field {
    /// A nullable, non-unique, unindexed column with ascending order.
    pub fn new(name: impl Into<String>, field_type: FieldType, member: MemberKind) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary: false,
            unique: false,
            nullable: true,
            default_value: None,
            index: false,
            asc_order: true,
            member,
            accessor: None,
        }
    }

    /// The `id INTEGER` primary key.
    pub fn identity() -> Self {
        let mut field = Self::new(
            IDENTITY,
            FieldType::Integer,
            MemberKind::required(MemberType::Int32),
        );
        field.primary = true;
        field.nullable = false;
        field
    }

    pub fn with_accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    pub fn is_identity(&self) -> bool {
        self.name == IDENTITY
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("primary", &self.primary)
            .field("unique", &self.unique)
            .field("nullable", &self.nullable)
            .field("default_value", &self.default_value)
            .field("index", &self.index)
            .field("asc_order", &self.asc_order)
            .field("member", &self.member)
            .finish()
    }
}

/// Fields keyed by name, iterated in insertion order.
///
/// At most one field may be primary and it must be the integer `id` column.
///
/// ```
/// use relmap_core::{Field, FieldSet, FieldType, MemberKind, MemberType, OrmError};
///
/// let mut fields = FieldSet::new();
/// fields.append(Field::identity()).unwrap();
/// fields
///     .append(Field::new("name", FieldType::Text, MemberKind::required(MemberType::Text)))
///     .unwrap();
/// assert_eq!(fields.names(), vec!["id", "name"]);
///
/// let err = fields.append(Field::identity()).unwrap_err();
/// assert!(matches!(err, OrmError::DuplicatePrimaryKeyDeclaration(_)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `field`, enforcing the naming and primary-key rules.
    ///
    /// # Errors
    ///
    /// - [`OrmError::InvalidFieldName`] for an empty or repeated name.
    /// - [`OrmError::InvalidPrimaryKeyType`] when `id` is not an integer primary key.
    /// - [`OrmError::DuplicatePrimaryKeyDeclaration`] for a second `id` or a
    ///   primary key on any other column.
    pub fn append(&mut self, field: Field) -> Result<()> {
        if field.name.is_empty() {
            return Err(OrmError::InvalidFieldName("empty field name".to_string()));
        }

        if field.is_identity() {
            if field.field_type != FieldType::Integer || !field.primary {
                return Err(OrmError::InvalidPrimaryKeyType {
                    member: field.name,
                    found: format!(
                        "{} {}",
                        field.field_type.storage_name(),
                        if field.primary { "primary" } else { "non-primary" }
                    ),
                });
            }
            if self.has_key() {
                return Err(OrmError::DuplicatePrimaryKeyDeclaration(field.name));
            }
        } else if field.primary {
            return Err(OrmError::DuplicatePrimaryKeyDeclaration(field.name));
        }

        if self.get(&field.name).is_some() {
            return Err(OrmError::InvalidFieldName(format!(
                "duplicate field `{}`",
                field.name
            )));
        }

        self.fields.push(field);
        Ok(())
    }

    /// True once the `id` primary key has been appended.
    pub fn has_key(&self) -> bool {
        self.fields.iter().any(|f| f.is_identity() && f.primary)
    }

    pub fn has_indexes(&self) -> bool {
        self.fields.iter().any(|f| f.index)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
