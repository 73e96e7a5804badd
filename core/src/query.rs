//! CRUD operation descriptors.
//!
//! A [`QuerySpec`] captures one operation against one entity before it is
//! executed: the kind, the source object, the string-encoded column values,
//! the condition with `?` placeholders and its positional arguments.
//!
//! # Factories
//!
//! | factory                     | transactional | condition          | values                   |
//! |-----------------------------|---------------|--------------------|--------------------------|
//! | [`QuerySpec::insert`]       | yes           | none               | every non-identity field |
//! | [`QuerySpec::update`]       | yes           | `id = ?`           | every non-identity field |
//! | [`QuerySpec::delete`]       | yes           | `id = ?` or none   | none                     |
//! | [`QuerySpec::select`]       | no            | none               | none                     |
//! | [`QuerySpec::select_where`] | no            | caller's           | none                     |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::field::IDENTITY;
use crate::types::Value;

/// Condition used for single-row updates and deletes.
pub const IDENTITY_CONDITION: &str = "id = ?";

/// Operation kind of a [`QuerySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Column name to string-encoded value, in insertion order. `None` is an
/// explicit SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentValues {
    entries: Vec<(String, Option<String>)>,
}

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing an earlier value in place.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name.into(), Some(value.into()));
    }

    pub fn put_null(&mut self, name: impl Into<String>) {
        self.set(name.into(), None);
    }

    fn set(&mut self, name: String, value: Option<String>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// `None` when `name` is absent, `Some(None)` when it is an explicit null.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ContentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={}", value.as_deref().unwrap_or("null"))?;
        }
        Ok(())
    }
}

/// Rows removed by a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Every row of the table.
    All,
    /// The row with this identity.
    Id(i32),
}

/// The object a spec was built from. Inserts hold it mutably so the
/// assigned identity can be written back.
pub enum Source<'o> {
    Shared(&'o dyn Any),
    Exclusive(&'o mut dyn Any),
}

impl Source<'_> {
    pub fn get(&self) -> &dyn Any {
        match self {
            Self::Shared(object) => *object,
            Self::Exclusive(object) => &**object,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut dyn Any> {
        match self {
            Self::Shared(_) => None,
            Self::Exclusive(object) => Some(&mut **object),
        }
    }
}

/// One CRUD operation on one entity.
pub struct QuerySpec<'o> {
    kind: QueryKind,
    entity: Arc<Entity>,
    object: Option<Source<'o>>,
    values: ContentValues,
    condition: Option<String>,
    args: Vec<String>,
    transactional: bool,
}

impl<'o> QuerySpec<'o> {
    fn blank(kind: QueryKind, entity: Arc<Entity>, transactional: bool) -> Self {
        Self {
            kind,
            entity,
            object: None,
            values: ContentValues::new(),
            condition: None,
            args: Vec::new(),
            transactional,
        }
    }

    /// Insert of `object`; every field but the identity is serialized.
    ///
    /// # Errors
    ///
    /// [`OrmError::AccessorInvocationFailure`] when `object` is not backed by
    /// `entity`, [`OrmError::RequiredFieldNull`] for a missing required value.
    pub fn insert(entity: Arc<Entity>, object: &'o mut dyn Any) -> Result<Self> {
        check_backing(&entity, &*object)?;
        let values = serialize(&entity, &*object, false, &[])?;
        let mut spec = Self::blank(QueryKind::Insert, entity, true);
        spec.values = values;
        spec.object = Some(Source::Exclusive(object));
        Ok(spec)
    }

    /// Update of the row matching `object`'s identity.
    ///
    /// # Errors
    ///
    /// Same as [`QuerySpec::insert`].
    pub fn update(entity: Arc<Entity>, object: &'o dyn Any) -> Result<Self> {
        check_backing(&entity, object)?;
        let values = serialize(&entity, object, false, &[])?;
        let id = read_identity(&entity, object)?;
        let mut spec = Self::blank(QueryKind::Update, entity, true);
        spec.values = values;
        spec.condition = Some(IDENTITY_CONDITION.to_string());
        spec.args.push(id);
        spec.object = Some(Source::Shared(object));
        Ok(spec)
    }

    pub fn delete(entity: Arc<Entity>, target: DeleteTarget) -> Self {
        let mut spec = Self::blank(QueryKind::Delete, entity, true);
        if let DeleteTarget::Id(id) = target {
            spec.condition = Some(IDENTITY_CONDITION.to_string());
            spec.args.push(id.to_string());
        }
        spec
    }

    /// Read of every row.
    pub fn select(entity: Arc<Entity>) -> Self {
        Self::blank(QueryKind::Select, entity, false)
    }

    /// Read of the rows matching `condition`.
    pub fn select_where(entity: Arc<Entity>, condition: impl Into<String>, args: Vec<String>) -> Self {
        let mut spec = Self::select(entity);
        spec.condition = Some(condition.into());
        spec.args = args;
        spec
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn table(&self) -> &str {
        self.entity.table_name()
    }

    pub fn object(&self) -> Option<&dyn Any> {
        self.object.as_ref().map(Source::get)
    }

    /// The source object, when the spec was built with mutable access.
    pub fn object_mut(&mut self) -> Option<&mut dyn Any> {
        self.object.as_mut().and_then(Source::get_mut)
    }

    pub fn values(&self) -> &ContentValues {
        &self.values
    }

    /// The condition, `None` when absent or blank.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Field names of the entity, the projection of a select.
    pub fn fields(&self) -> Vec<&str> {
        self.entity.fields().names()
    }

    /// Identity held in the value bag, 0 when absent or not an integer.
    pub fn id(&self) -> i32 {
        self.values
            .get(IDENTITY)
            .flatten()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_kind(&mut self, kind: QueryKind) {
        self.kind = kind;
    }

    pub fn set_transactional(&mut self, transactional: bool) {
        self.transactional = transactional;
    }

    pub fn set_condition(&mut self, condition: Option<String>) {
        self.condition = condition;
    }

    pub fn set_values(&mut self, values: ContentValues) {
        self.values = values;
    }

    /// Adds an encoded value; [`Value::Null`] becomes an explicit null.
    pub fn add_value(&mut self, name: &str, value: Value) {
        match value.encode() {
            Some(encoded) => self.values.put(name, encoded),
            None => self.values.put_null(name),
        }
    }

    pub fn add_null(&mut self, name: &str) {
        self.values.put_null(name);
    }

    /// Appends a positional argument in its string encoding.
    pub fn add_arg(&mut self, arg: impl ToString) {
        self.args.push(arg.to_string());
    }

    pub fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    pub fn clear_args(&mut self) {
        self.args.clear();
    }

    /// Statement trace: `KIND over table | values [..] condition [..] variables [ .. ]`.
    /// Empty clauses are left out.
    pub fn trace_line(&self) -> String {
        let mut line = format!("{} over {} |", self.kind, self.table());
        if !self.values.is_empty() {
            line.push_str(&format!(" values [{}]", self.values));
        }
        if let Some(condition) = self.condition() {
            line.push_str(&format!(" condition [{condition}]"));
        }
        if !self.args.is_empty() {
            line.push_str(" variables [ ");
            for arg in &self.args {
                line.push_str(arg);
                line.push(' ');
            }
            line.push(']');
        }
        line
    }
}

impl fmt::Display for QuerySpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table->{}; condition->{}; values{{{}}}; args->[{}]; transactional->{}; type->{}",
            self.table(),
            self.condition.as_deref().unwrap_or("null"),
            self.values,
            self.args.join(", "),
            self.transactional,
            self.kind
        )
    }
}

impl fmt::Debug for QuerySpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("kind", &self.kind)
            .field("table", &self.table())
            .field("values", &self.values)
            .field("condition", &self.condition)
            .field("args", &self.args)
            .field("transactional", &self.transactional)
            .finish()
    }
}

/// Encodes the fields of `object` into a value bag.
///
/// The identity is skipped unless `include_identity` is set, as is every
/// field named in `filter`. A missing value on a nullable field becomes an
/// explicit null.
///
/// # Errors
///
/// [`OrmError::RequiredFieldNull`] when a non-nullable field has no value;
/// [`OrmError::AccessorInvocationFailure`] when a field cannot be read.
pub fn serialize(
    entity: &Entity,
    object: &dyn Any,
    include_identity: bool,
    filter: &[&str],
) -> Result<ContentValues> {
    let mut values = ContentValues::new();
    for field in entity.fields() {
        if (!include_identity && field.is_identity()) || filter.contains(&field.name.as_str()) {
            continue;
        }
        let accessor = field
            .accessor
            .as_ref()
            .ok_or_else(|| OrmError::accessor(&field.name, "field has no accessor"))?;

        match accessor.read(&field.name, object)?.encode() {
            Some(encoded) => values.put(field.name.clone(), encoded),
            None if field.nullable => values.put_null(field.name.clone()),
            None => {
                return Err(OrmError::RequiredFieldNull {
                    field: field.name.clone(),
                    table: entity.table_name().to_string(),
                });
            }
        }
    }
    Ok(values)
}

fn check_backing(entity: &Entity, object: &dyn Any) -> Result<()> {
    if Any::type_id(object) == entity.backing_type() {
        Ok(())
    } else {
        Err(OrmError::accessor(
            IDENTITY,
            format!("object is not a {}", entity.type_name()),
        ))
    }
}

fn read_identity(entity: &Entity, object: &dyn Any) -> Result<String> {
    let field = entity
        .field(IDENTITY)
        .ok_or_else(|| OrmError::MissingPrimaryKey(entity.type_name().to_string()))?;
    let accessor = field
        .accessor
        .as_ref()
        .ok_or_else(|| OrmError::accessor(IDENTITY, "field has no accessor"))?;
    accessor
        .read(IDENTITY, object)?
        .encode()
        .ok_or_else(|| OrmError::RequiredFieldNull {
            field: IDENTITY.to_string(),
            table: entity.table_name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Column, Mapped, Member, Table, TypeDescriptor};
    use crate::extract::extract_entity;

    #[derive(Debug, Default)]
    struct Note {
        id: i32,
        title: Option<String>,
        body: Option<String>,
        stars: i32,
    }

    impl Mapped for Note {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::of()
                .table(Table::named("notes"))
                .member(
                    Member::new("id", |n: &Note| n.id, |n: &mut Note, v| n.id = v)
                        .column(Column::new().primary()),
                )
                .member(
                    Member::new("title", |n: &Note| n.title.clone(), |n: &mut Note, v| n.title = v)
                        .column(Column::new().not_null()),
                )
                .member(
                    Member::new("body", |n: &Note| n.body.clone(), |n: &mut Note, v| n.body = v)
                        .column(Column::new()),
                )
                .member(
                    Member::new("stars", |n: &Note| n.stars, |n: &mut Note, v| n.stars = v)
                        .column(Column::new().not_null()),
                )
        }
    }

    fn notes() -> Arc<Entity> {
        Arc::new(extract_entity::<Note>().unwrap())
    }

    fn sample() -> Note {
        Note {
            id: 7,
            title: Some("groceries".into()),
            body: None,
            stars: 3,
        }
    }

    #[test]
    fn test_insert_spec() {
        let mut note = sample();
        let spec = QuerySpec::insert(notes(), &mut note).unwrap();
        assert_eq!(spec.kind(), QueryKind::Insert);
        assert!(spec.is_transactional());
        assert_eq!(spec.values().names(), vec!["title", "body", "stars"]);
        assert_eq!(spec.values().get("body"), Some(None));
        assert_eq!(spec.values().get("stars"), Some(Some("3")));
        assert!(spec.condition().is_none());
        assert!(spec.args().is_empty());
        assert_eq!(spec.id(), 0);
    }

    #[test]
    fn test_update_spec_targets_identity() {
        let note = sample();
        let spec = QuerySpec::update(notes(), &note).unwrap();
        assert_eq!(spec.condition(), Some("id = ?"));
        assert_eq!(spec.args(), ["7".to_string()]);
        assert!(!spec.values().contains("id"));
        assert!(spec.object().unwrap().downcast_ref::<Note>().is_some());
    }

    #[test]
    fn test_delete_spec() {
        let all = QuerySpec::delete(notes(), DeleteTarget::All);
        assert!(all.condition().is_none());
        assert!(all.args().is_empty());
        assert!(all.is_transactional());

        let one = QuerySpec::delete(notes(), DeleteTarget::Id(12));
        assert_eq!(one.condition(), Some("id = ?"));
        assert_eq!(one.args(), ["12".to_string()]);
    }

    #[test]
    fn test_select_specs() {
        let spec = QuerySpec::select(notes());
        assert!(!spec.is_transactional());
        assert_eq!(spec.fields(), vec!["id", "title", "body", "stars"]);

        let spec = QuerySpec::select_where(notes(), "stars > ?", vec!["2".into()]);
        assert_eq!(spec.condition(), Some("stars > ?"));
        assert_eq!(spec.args(), ["2".to_string()]);
    }

    #[test]
    fn test_serialize_required_field_null() {
        let note = Note {
            title: None,
            ..sample()
        };
        let err = serialize(&notes(), &note, false, &[]).unwrap_err();
        assert_eq!(
            err,
            OrmError::RequiredFieldNull {
                field: "title".into(),
                table: "notes".into(),
            }
        );
        assert_eq!(err.to_string(), "field title in table notes can't be null");
    }

    #[test]
    fn test_serialize_identity_and_filter() {
        let note = sample();
        let values = serialize(&notes(), &note, true, &["body", "stars"]).unwrap();
        assert_eq!(values.names(), vec!["id", "title"]);
        assert_eq!(values.get("id"), Some(Some("7")));
    }

    #[test]
    fn test_wrong_object_type() {
        let mut other = String::from("not a note");
        let err = QuerySpec::insert(notes(), &mut other).unwrap_err();
        assert!(matches!(err, OrmError::AccessorInvocationFailure { .. }));
    }

    #[test]
    fn test_mutators() {
        let mut spec = QuerySpec::select(notes());
        spec.add_arg(1);
        spec.add_arg(2.5f32);
        spec.add_arg("x");
        assert_eq!(spec.args(), ["1", "2.5", "x"]);
        spec.set_args(vec!["9".into()]);
        assert_eq!(spec.args(), ["9"]);
        spec.clear_args();
        assert!(spec.args().is_empty());

        spec.add_value("id", Value::Int32(5));
        spec.add_value("body", Value::Null);
        spec.add_null("title");
        assert_eq!(spec.id(), 5);
        assert_eq!(spec.values().to_string(), "id=5 body=null title=null");

        spec.set_kind(QueryKind::Delete);
        spec.set_transactional(true);
        spec.set_condition(Some("stars = ?".into()));
        assert_eq!(spec.kind(), QueryKind::Delete);
        assert!(spec.is_transactional());
        assert_eq!(spec.condition(), Some("stars = ?"));
    }

    #[test]
    fn test_trace_line() {
        let note = sample();
        let spec = QuerySpec::update(notes(), &note).unwrap();
        assert_eq!(
            spec.trace_line(),
            "UPDATE over notes | values [title=groceries body=null stars=3] condition [id = ?] variables [ 7 ]"
        );

        let spec = QuerySpec::delete(notes(), DeleteTarget::All);
        assert_eq!(spec.trace_line(), "DELETE over notes |");
    }

    #[test]
    fn test_display() {
        let spec = QuerySpec::delete(notes(), DeleteTarget::Id(4));
        assert_eq!(
            spec.to_string(),
            "table->notes; condition->id = ?; values{}; args->[4]; transactional->true; type->DELETE"
        );
    }
}
