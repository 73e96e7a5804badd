//! Entity metadata, schema registry and SQL generation.
//!
//! This crate turns mapped Rust types into relational schema metadata and
//! the SQL text that creates and manipulates it:
//!
//! - [`Mapped`] / [`TypeDescriptor`]: the explicit schema description a type
//!   supplies: a [`Table`] marker and one [`Member`] per field, each with an
//!   optional [`Column`] marker and a typed getter/setter pair.
//! - [`extract_entity`]: validates a descriptor and derives an [`Entity`]
//!   with its ordered [`FieldSet`].
//! - [`SchemaRegistry`]: registered entities in registration order, and the
//!   `CREATE`/`DROP` statements derived from them.
//! - [`sql`]: pure text generation for DDL and parameterized DML.
//! - [`QuerySpec`]: one CRUD operation ready for an executor.
//!
//! Execution against a database lives in `relmap-sqlite`.
//!
//! # Example
//!
//! ```
//! use relmap_core::*;
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
//! let registry = SchemaRegistry::new();
//! let entity = registry.add::<Player>().unwrap();
//! assert_eq!(
//!     sql::create_table(&entity),
//!     "CREATE TABLE Player (id INTEGER PRIMARY KEY AUTOINCREMENT,name TEXT NOT NULL,score REAL)"
//! );
//!
//! let mut player = Player { name: "abc".into(), score: Some(1.5), ..Default::default() };
//! let spec = QuerySpec::insert(entity, &mut player).unwrap();
//! assert_eq!(spec.trace_line(), "INSERT over Player | values [name=abc score=1.5]");
//! ```

mod descriptor;
mod entity;
mod error;
mod extract;
mod field;
mod query;
mod registry;
pub mod sql;
mod types;

pub use descriptor::{Accessor, Column, Mapped, Member, Table, TypeDescriptor};
pub use entity::Entity;
pub use error::{OrmError, Result};
pub use extract::{extract_descriptor, extract_entity};
pub use field::{Field, FieldSet, IDENTITY};
pub use query::{ContentValues, DeleteTarget, IDENTITY_CONDITION, QueryKind, QuerySpec, Source, serialize};
pub use registry::SchemaRegistry;
pub use types::{FieldType, MemberKind, MemberType, MemberValue, Value};
