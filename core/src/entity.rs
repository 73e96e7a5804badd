//! One mapped table bound to its backing Rust type.

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::{OrmError, Result};
use crate::field::{Field, FieldSet};

/// Schema of one mapped type: table name, fields and a factory for blank
/// instances used during materialization.
pub struct Entity {
    table_name: String,
    type_name: &'static str,
    type_id: TypeId,
    fields: FieldSet,
    factory: fn() -> Box<dyn Any>,
    loaded: bool,
}

fn make_default<T: Default + 'static>() -> Box<dyn Any> {
    Box::new(T::default())
}

impl Entity {
    pub(crate) fn new<T: Default + 'static>(
        table_name: impl Into<String>,
        type_name: &'static str,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            type_name,
            type_id: TypeId::of::<T>(),
            fields: FieldSet::new(),
            factory: make_default::<T>,
            loaded: false,
        }
    }

    /// Appends a field, tagging any violation with this entity's table.
    pub(crate) fn append_field(&mut self, field: Field) -> Result<()> {
        self.fields
            .append(field)
            .map_err(|source| OrmError::InEntity {
                table: self.table_name.clone(),
                source: Box::new(source),
            })
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Simple name of the backing type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn has_key(&self) -> bool {
        self.fields.has_key()
    }

    pub fn has_indexes(&self) -> bool {
        self.fields.has_indexes()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_backed_by<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn backing_type(&self) -> TypeId {
        self.type_id
    }

    /// A default-constructed instance of the backing type.
    pub fn instantiate(&self) -> Box<dyn Any> {
        (self.factory)()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("table_name", &self.table_name)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("loaded", &self.loaded)
            .finish()
    }
}
