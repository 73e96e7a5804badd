//! Derives an [`Entity`] from a type descriptor.
//!
//! # Rules
//!
//! - The descriptor must carry a [`Table`](crate::Table) marker. Its name
//!   overrides the table name; an empty name falls back to the type name.
//! - Members without a [`Column`](crate::Column) marker are skipped.
//! - A primary column must sit on a plain `i32` member and always becomes the
//!   `id INTEGER` identity column, whatever the member is called.
//! - Other columns map `String` to TEXT, `i32`/`i64` to INTEGER and
//!   `f32`/`f64` to REAL (optional or not). Anything else is rejected.
//! - A nullable column on a non-optional numeric member is rejected.
//! - Numeric defaults must parse: INTEGER as `i32`, REAL as a finite `f64`.
//! - Extraction fails unless the identity column was produced.

use tracing::debug;

use crate::descriptor::{Column, Mapped, Member, TypeDescriptor};
use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::field::Field;
use crate::types::{FieldType, MemberKind, MemberType};

/// Extracts the entity for `T` from its descriptor.
///
/// # Errors
///
/// Any of the schema-derivation errors of [`OrmError`]; field-set violations
/// come wrapped in [`OrmError::InEntity`].
pub fn extract_entity<T: Mapped>() -> Result<Entity> {
    extract_descriptor(&T::describe())
}

/// Extracts an entity from an explicit descriptor.
pub fn extract_descriptor<T: Mapped>(descriptor: &TypeDescriptor<T>) -> Result<Entity> {
    let table = descriptor
        .table_marker()
        .ok_or_else(|| OrmError::EntityNotMapped(descriptor.type_name().to_string()))?;

    let table_name = if table.name.is_empty() {
        descriptor.type_name().to_string()
    } else {
        table.name.clone()
    };

    let mut entity = Entity::new::<T>(table_name, descriptor.type_name());

    for member in descriptor.members() {
        let Some(column) = member.column_marker() else {
            continue;
        };

        let field = if column.primary {
            identity_field(member)?
        } else {
            column_field(member, column)?
        };
        entity.append_field(field)?;
    }

    if !entity.has_key() {
        return Err(OrmError::MissingPrimaryKey(descriptor.type_name().to_string()));
    }

    entity.mark_loaded();
    debug!(
        table = entity.table_name(),
        fields = entity.fields().len(),
        "extracted entity"
    );
    Ok(entity)
}

fn identity_field<T: 'static>(member: &Member<T>) -> Result<Field> {
    if member.kind() != MemberKind::required(MemberType::Int32) {
        return Err(OrmError::InvalidPrimaryKeyType {
            member: member.name().to_string(),
            found: member.kind().to_string(),
        });
    }
    Ok(Field::identity().with_accessor(member.accessor().clone()))
}

fn column_field<T: 'static>(member: &Member<T>, column: &Column) -> Result<Field> {
    let kind = member.kind();
    let field_type = storage_type(kind.ty).ok_or_else(|| OrmError::UnsupportedFieldType {
        member: member.name().to_string(),
        found: kind.to_string(),
    })?;

    if column.nullable && kind.is_primitive() {
        return Err(OrmError::NullablePrimitiveConflict(member.name().to_string()));
    }

    let default_value = if column.default_value.is_empty() {
        None
    } else {
        check_default(member.name(), field_type, &column.default_value)?;
        Some(column.default_value.clone())
    };

    let mut field = Field::new(member.name(), field_type, kind).with_accessor(member.accessor().clone());
    field.unique = column.unique;
    field.nullable = column.nullable;
    field.default_value = default_value;
    field.index = column.index;
    field.asc_order = column.asc_order;
    Ok(field)
}

fn storage_type(ty: MemberType) -> Option<FieldType> {
    match ty {
        MemberType::Text => Some(FieldType::Text),
        MemberType::Int32 | MemberType::Int64 => Some(FieldType::Integer),
        MemberType::Float32 | MemberType::Float64 => Some(FieldType::Real),
        MemberType::Bool | MemberType::Timestamp => None,
    }
}

fn check_default(member: &str, field_type: FieldType, value: &str) -> Result<()> {
    let valid = match field_type {
        FieldType::Integer => value.parse::<i32>().is_ok(),
        FieldType::Real => value.parse::<f64>().is_ok_and(f64::is_finite),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(OrmError::InvalidDefaultValue {
            member: member.to_string(),
            value: value.to_string(),
        })
    }
}
