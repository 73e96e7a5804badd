//! Schema derivation and SQL generation through the public API.

use relmap_core::*;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Default)]
struct Score {
    id: i32,
    name: String,
    score: Option<f64>,
}

impl Mapped for Score {
    fn describe() -> TypeDescriptor<Self> {
        TypeDescriptor::new("T")
            .table(Table::default())
            .member(
                Member::new("id", |s: &Score| s.id, |s: &mut Score, v| s.id = v)
                    .column(Column::new().primary()),
            )
            .member(
                Member::new("name", |s: &Score| s.name.clone(), |s: &mut Score, v| s.name = v)
                    .column(Column::new().not_null()),
            )
            .member(
                Member::new("score", |s: &Score| s.score, |s: &mut Score, v| s.score = v)
                    .column(Column::new()),
            )
    }
}

#[derive(Debug, Default)]
struct Keyless {
    name: String,
}

impl Mapped for Keyless {
    fn describe() -> TypeDescriptor<Self> {
        TypeDescriptor::of().table(Table::default()).member(
            Member::new("name", |k: &Keyless| k.name.clone(), |k: &mut Keyless, v| k.name = v)
                .column(Column::new()),
        )
    }
}

#[derive(Debug, Default)]
struct Gauge {
    id: i32,
    level: i32,
}

impl Mapped for Gauge {
    fn describe() -> TypeDescriptor<Self> {
        TypeDescriptor::of()
            .table(Table::named("gauges"))
            .member(
                Member::new("id", |g: &Gauge| g.id, |g: &mut Gauge, v| g.id = v)
                    .column(Column::new().primary()),
            )
            .member(
                // Columns are nullable unless told otherwise.
                Member::new("level", |g: &Gauge| g.level, |g: &mut Gauge, v| g.level = v)
                    .column(Column::new()),
            )
    }
}

#[derive(Debug, Default)]
struct Unmapped {
    id: i32,
}

impl Mapped for Unmapped {
    fn describe() -> TypeDescriptor<Self> {
        TypeDescriptor::of().member(
            Member::new("id", |u: &Unmapped| u.id, |u: &mut Unmapped, v| u.id = v)
                .column(Column::new().primary()),
        )
    }
}

#[derive(Debug, Default)]
struct Profile {
    id: i32,
    handle: Option<String>,
    bio: Option<String>,
    karma: Option<i64>,
}

impl Mapped for Profile {
    fn describe() -> TypeDescriptor<Self> {
        TypeDescriptor::of()
            .table(Table::named("profiles"))
            .member(
                Member::new("id", |p: &Profile| p.id, |p: &mut Profile, v| p.id = v)
                    .column(Column::new().primary()),
            )
            .member(
                Member::new("handle", |p: &Profile| p.handle.clone(), |p: &mut Profile, v| {
                    p.handle = v
                })
                .column(Column::new().not_null().unique().index()),
            )
            .member(
                Member::new("bio", |p: &Profile| p.bio.clone(), |p: &mut Profile, v| p.bio = v)
                    .column(Column::new().default_value("n/a")),
            )
            .member(
                Member::new("karma", |p: &Profile| p.karma, |p: &mut Profile, v| p.karma = v)
                    .column(Column::new().default_value("0").descending()),
            )
    }
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extraction_with_integer_key_has_key() {
    let entity = extract_entity::<Score>().unwrap();
    assert!(entity.has_key());
    assert!(entity.is_loaded());
    assert_eq!(entity.table_name(), "T");
}

#[test]
fn test_extraction_without_key_fails() {
    let err = extract_entity::<Keyless>().unwrap_err();
    assert_eq!(err, OrmError::MissingPrimaryKey("Keyless".into()));
}

#[test]
fn test_nullable_primitive_conflict() {
    let err = extract_entity::<Gauge>().unwrap_err();
    assert_eq!(err, OrmError::NullablePrimitiveConflict("level".into()));
}

#[test]
fn test_missing_table_marker() {
    let err = extract_entity::<Unmapped>().unwrap_err();
    assert!(matches!(err, OrmError::EntityNotMapped(name) if name == "Unmapped"));
}

// ============================================================================
// SQL text
// ============================================================================

#[test]
fn test_create_table_exact_text() {
    let entity = extract_entity::<Score>().unwrap();
    assert_eq!(
        sql::create_table(&entity),
        "CREATE TABLE T (id INTEGER PRIMARY KEY AUTOINCREMENT,name TEXT NOT NULL,score REAL)"
    );
}

#[test]
fn test_create_table_is_repeatable() {
    let entity = extract_entity::<Profile>().unwrap();
    let again = extract_entity::<Profile>().unwrap();
    let first = sql::create_table(&entity);
    assert_eq!(sql::create_table(&entity), first);
    assert_eq!(sql::create_table(&again), first);
}

#[test]
fn test_profile_ddl() {
    let registry = SchemaRegistry::new();
    registry.add::<Profile>().unwrap();
    assert_eq!(
        registry.create_statements(),
        vec![
            "CREATE TABLE profiles (id INTEGER PRIMARY KEY AUTOINCREMENT,\
             handle TEXT NOT NULL UNIQUE,\
             bio TEXT DEFAULT('n/a'),\
             karma INTEGER DEFAULT(0))",
            "CREATE INDEX index_profiles_handle ON profiles(handle ASC)",
            "CREATE INDEX index_profiles_karma ON profiles(karma DESC)",
        ]
    );
    assert_eq!(sql::count("profiles"), "SELECT COUNT(id) FROM profiles");
    assert_eq!(
        sql::field_names_csv(registry.get_entity::<Profile>().unwrap().fields()),
        "id,handle,bio,karma"
    );
}

// ============================================================================
// Registry and serialization
// ============================================================================

#[test]
fn test_registry_add_twice() {
    let registry = SchemaRegistry::new();
    registry.add::<Score>().unwrap();
    registry.add::<Score>().unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.create_statements().len(), 1);
    assert_eq!(registry.entities()[0].table_name(), "T");
}

#[test]
fn test_registry_rejects_invalid_type() {
    let registry = SchemaRegistry::new();
    registry.add::<Score>().unwrap();
    assert!(registry.add::<Keyless>().is_err());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_serialize_required_field_null_names_field_and_table() {
    let entity = extract_entity::<Profile>().unwrap();
    let profile = Profile {
        id: 1,
        handle: None,
        ..Default::default()
    };
    let err = serialize(&entity, &profile, false, &[]).unwrap_err();
    assert_eq!(
        err,
        OrmError::RequiredFieldNull {
            field: "handle".into(),
            table: "profiles".into(),
        }
    );
}

#[test]
fn test_serialize_nullable_fields_become_null() {
    let entity = extract_entity::<Profile>().unwrap();
    let profile = Profile {
        id: 1,
        handle: Some("kim".into()),
        bio: None,
        karma: Some(12),
    };
    let values = serialize(&entity, &profile, false, &[]).unwrap();
    assert_eq!(values.to_string(), "handle=kim bio=null karma=12");
}
