//! Explicit schema descriptors for mapped types.
//!
//! A mapped type implements [`Mapped`] and returns a [`TypeDescriptor`]: an
//! optional [`Table`] marker plus one [`Member`] per persisted field. Each
//! member may carry a [`Column`] marker and always carries a typed getter and
//! setter, erased into an [`Accessor`] so the rest of the crate can read and
//! write members without knowing the concrete type.
//!
//! # Example
//!
//! ```
//! use relmap_core::{Column, Mapped, Member, Table, TypeDescriptor};
//!
//! #[derive(Debug, Default)]
//! struct Player {
//!     id: i32,
//!     name: String,
//!     score: Option<f64>,
//! }
//!
//! impl Mapped for Player {
//!     fn describe() -> TypeDescriptor<Self> {
//!         TypeDescriptor::of()
//!             .table(Table::default())
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
//! let descriptor = Player::describe();
//! assert_eq!(descriptor.type_name(), "Player");
//! assert_eq!(descriptor.members().len(), 3);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{OrmError, Result};
use crate::types::{MemberKind, MemberValue, Value};

/// A Rust type persisted as one table.
///
/// `Default` stands in for the zero-argument constructor used when rows are
/// materialized.
pub trait Mapped: Default + 'static {
    fn describe() -> TypeDescriptor<Self>;
}

/// Table marker. An empty name means "use the type's simple name".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub name: String,
}

impl Table {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Column marker with the same defaults as an unannotated column:
/// nullable, not unique, not indexed, ascending index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub primary: bool,
    pub unique: bool,
    pub nullable: bool,
    pub default_value: String,
    pub index: bool,
    pub asc_order: bool,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            primary: false,
            unique: false,
            nullable: true,
            default_value: String::new(),
            index: false,
            asc_order: true,
        }
    }
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Indexes the column in descending order.
    pub fn descending(mut self) -> Self {
        self.index = true;
        self.asc_order = false;
        self
    }
}

trait ErasedAccessor: Send + Sync {
    fn read(&self, object: &dyn Any) -> std::result::Result<Value, String>;
    fn write(&self, object: &mut dyn Any, value: Value) -> std::result::Result<(), String>;
}

struct TypedAccessor<T, V> {
    get: fn(&T) -> V,
    set: fn(&mut T, V),
}

impl<T: 'static, V: MemberValue> ErasedAccessor for TypedAccessor<T, V> {
    fn read(&self, object: &dyn Any) -> std::result::Result<Value, String> {
        let object = object
            .downcast_ref::<T>()
            .ok_or_else(|| format!("object is not a {}", type_name::<T>()))?;
        Ok((self.get)(object).into_value())
    }

    fn write(&self, object: &mut dyn Any, value: Value) -> std::result::Result<(), String> {
        let object = object
            .downcast_mut::<T>()
            .ok_or_else(|| format!("object is not a {}", type_name::<T>()))?;
        let shown = format!("{value:?}");
        let value = V::from_value(value)
            .ok_or_else(|| format!("value {shown} does not fit member type {}", V::KIND))?;
        (self.set)(object, value);
        Ok(())
    }
}

/// Type-erased getter/setter pair for one member.
#[derive(Clone)]
pub struct Accessor {
    inner: Arc<dyn ErasedAccessor>,
}

impl Accessor {
    pub fn new<T: 'static, V: MemberValue>(get: fn(&T) -> V, set: fn(&mut T, V)) -> Self {
        Self {
            inner: Arc::new(TypedAccessor { get, set }),
        }
    }

    /// Reads the member for `field` from `object`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::AccessorInvocationFailure`] when `object` is not
    /// the type this accessor was built for.
    pub fn read(&self, field: &str, object: &dyn Any) -> Result<Value> {
        self.inner
            .read(object)
            .map_err(|reason| OrmError::accessor(field, reason))
    }

    /// Writes `value` into the member for `field` on `object`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::AccessorInvocationFailure`] when `object` has the
    /// wrong type or `value` cannot be stored in the member.
    pub fn write(&self, field: &str, object: &mut dyn Any, value: Value) -> Result<()> {
        self.inner
            .write(object, value)
            .map_err(|reason| OrmError::accessor(field, reason))
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor")
    }
}

/// One declared member of a mapped type.
pub struct Member<T> {
    name: &'static str,
    kind: MemberKind,
    column: Option<Column>,
    accessor: Accessor,
    _owner: PhantomData<fn() -> T>,
}

impl<T: 'static> Member<T> {
    /// Declares a member with its getter and setter. Without a
    /// [`column`](Self::column) marker the member is not persisted.
    pub fn new<V: MemberValue>(name: &'static str, get: fn(&T) -> V, set: fn(&mut T, V)) -> Self {
        Self {
            name,
            kind: V::KIND,
            column: None,
            accessor: Accessor::new(get, set),
            _owner: PhantomData,
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn column_marker(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }
}

/// Schema description of a mapped type.
pub struct TypeDescriptor<T> {
    type_name: &'static str,
    table: Option<Table>,
    members: Vec<Member<T>>,
}

impl<T: Mapped> TypeDescriptor<T> {
    /// Starts a descriptor named after the type's simple name.
    pub fn of() -> Self {
        Self::new(simple_type_name::<T>())
    }

    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: None,
            members: Vec::new(),
        }
    }

    pub fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    pub fn member(mut self, member: Member<T>) -> Self {
        self.members.push(member);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_marker(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn members(&self) -> &[Member<T>] {
        &self.members
    }
}

/// Last path segment of the type name, without generic arguments.
pub(crate) fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        id: i32,
        label: Option<String>,
    }

    impl Mapped for Sample {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::of()
                .member(Member::new("id", |s: &Sample| s.id, |s: &mut Sample, v| s.id = v))
                .member(Member::new(
                    "label",
                    |s: &Sample| s.label.clone(),
                    |s: &mut Sample, v| s.label = v,
                ))
        }
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name::<Sample>(), "Sample");
        assert_eq!(simple_type_name::<Vec<String>>(), "Vec");
        assert_eq!(Sample::describe().type_name(), "Sample");
    }

    #[test]
    fn test_column_defaults() {
        let column = Column::new();
        assert!(column.nullable);
        assert!(column.asc_order);
        assert!(!column.primary && !column.unique && !column.index);
        assert!(column.default_value.is_empty());

        let desc = Column::new().descending();
        assert!(desc.index);
        assert!(!desc.asc_order);
    }

    #[test]
    fn test_accessor_read_write() {
        let descriptor = Sample::describe();
        let label = &descriptor.members()[1];
        let mut sample = Sample::default();

        label
            .accessor()
            .write("label", &mut sample, Value::Text("north".into()))
            .unwrap();
        assert_eq!(sample.label.as_deref(), Some("north"));
        assert_eq!(
            label.accessor().read("label", &sample).unwrap(),
            Value::Text("north".into())
        );

        label.accessor().write("label", &mut sample, Value::Null).unwrap();
        assert_eq!(label.accessor().read("label", &sample).unwrap(), Value::Null);
    }

    #[test]
    fn test_accessor_rejects_wrong_object_and_value() {
        let descriptor = Sample::describe();
        let id = &descriptor.members()[0];
        let mut other = String::new();

        let err = id.accessor().read("id", &other).unwrap_err();
        assert!(matches!(err, OrmError::AccessorInvocationFailure { .. }));

        let err = id
            .accessor()
            .write("id", &mut other, Value::Int32(1))
            .unwrap_err();
        assert!(matches!(err, OrmError::AccessorInvocationFailure { .. }));

        let mut sample = Sample::default();
        let err = id
            .accessor()
            .write("id", &mut sample, Value::Null)
            .unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }
}
