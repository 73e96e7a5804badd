//! Registered entities and the schema DDL derived from them.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::descriptor::Mapped;
use crate::entity::Entity;
use crate::error::Result;
use crate::extract::extract_entity;
use crate::sql;

#[derive(Default)]
struct Entries {
    order: Vec<Arc<Entity>>,
    by_type: HashMap<TypeId, usize>,
}

/// Backing type to [`Entity`] map, iterated in registration order.
///
/// `add` and `clear` take the write lock; every other call takes the read
/// lock, so a registry can be shared across threads behind an `Arc`.
///
/// ```
/// use relmap_core::{Column, Mapped, Member, SchemaRegistry, Table, TypeDescriptor};
///
/// #[derive(Default)]
/// struct Tag {
///     id: i32,
///     label: String,
/// }
///
/// impl Mapped for Tag {
///     fn describe() -> TypeDescriptor<Self> {
///         TypeDescriptor::of()
///             .table(Table::named("tags"))
///             .member(
///                 Member::new("id", |t: &Tag| t.id, |t: &mut Tag, v| t.id = v)
///                     .column(Column::new().primary()),
///             )
///             .member(
///                 Member::new("label", |t: &Tag| t.label.clone(), |t: &mut Tag, v| t.label = v)
///                     .column(Column::new().not_null().index()),
///             )
///     }
/// }
///
/// let registry = SchemaRegistry::new();
/// registry.add::<Tag>().unwrap();
/// assert_eq!(
///     registry.create_statements(),
///     vec![
///         "CREATE TABLE tags (id INTEGER PRIMARY KEY AUTOINCREMENT,label TEXT NOT NULL)".to_string(),
///         "CREATE INDEX index_tags_label ON tags(label ASC)".to_string(),
///     ]
/// );
/// ```
#[derive(Default)]
pub struct SchemaRegistry {
    entries: RwLock<Entries>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, extracting its entity on first call only.
    ///
    /// # Errors
    ///
    /// Propagates extraction errors; nothing is stored in that case.
    pub fn add<T: Mapped>(&self) -> Result<Arc<Entity>> {
        let key = TypeId::of::<T>();
        if let Some(entity) = self.lookup(key) {
            return Ok(entity);
        }

        let entity = Arc::new(extract_entity::<T>()?);

        let mut entries = self.entries.write();
        // Another caller may have registered T while we were extracting.
        if let Some(&pos) = entries.by_type.get(&key) {
            return Ok(Arc::clone(&entries.order[pos]));
        }
        let pos = entries.order.len();
        entries.order.push(Arc::clone(&entity));
        entries.by_type.insert(key, pos);
        info!(table = entity.table_name(), "registered entity");
        Ok(entity)
    }

    pub fn get_entity<T: 'static>(&self) -> Option<Arc<Entity>> {
        self.lookup(TypeId::of::<T>())
    }

    /// Looks an entity up by table name.
    pub fn find_table(&self, table: &str) -> Option<Arc<Entity>> {
        self.entries
            .read()
            .order
            .iter()
            .find(|e| e.table_name() == table)
            .cloned()
    }

    fn lookup(&self, key: TypeId) -> Option<Arc<Entity>> {
        let entries = self.entries.read();
        entries
            .by_type
            .get(&key)
            .map(|&pos| Arc::clone(&entries.order[pos]))
    }

    /// `CREATE TABLE` for every entity, each followed by its `CREATE INDEX`
    /// statements.
    pub fn create_statements(&self) -> Vec<String> {
        let entries = self.entries.read();
        let mut statements = Vec::new();
        for entity in &entries.order {
            statements.push(sql::create_table(entity));
            statements.extend(sql::create_indexes(entity));
        }
        statements
    }

    pub fn drop_statements(&self) -> Vec<String> {
        self.entries
            .read()
            .order
            .iter()
            .map(|e| sql::drop_table(e.table_name()))
            .collect()
    }

    /// Snapshot of the registered entities in registration order.
    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.entries.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().order.is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let released = entries.order.len();
        entries.order.clear();
        entries.by_type.clear();
        debug!(released, "cleared schema registry");
    }
}
