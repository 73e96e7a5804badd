//! SQL text generation for entities.
//!
//! Every function here is pure: the same entity always yields the same text.
//! The exact strings are part of the public contract.
//!
//! # Statement forms
//!
//! - `CREATE TABLE <table> (<col>,<col>,...)`
//! - `CREATE INDEX index_<table>_<field> ON <table>(<field> ASC|DESC)`
//! - `DROP TABLE IF EXISTS <table>`
//! - `SELECT COUNT(id) FROM <table>`
//!
//! The DML helpers build the parameterized statements the executor binds
//! positional arguments into.

use crate::entity::Entity;
use crate::field::{Field, FieldSet, IDENTITY};

/// `CREATE TABLE` for `entity`, columns in field order.
pub fn create_table(entity: &Entity) -> String {
    let columns: Vec<String> = entity.fields().iter().map(column_definition).collect();
    format!("CREATE TABLE {} ({})", entity.table_name(), columns.join(","))
}

fn column_definition(field: &Field) -> String {
    let mut sql = format!("{} {}", field.name, field.field_type.storage_name());

    if field.primary {
        sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        return sql;
    }

    if !field.nullable {
        sql.push_str(" NOT NULL");
    }
    if field.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = field.default_value.as_deref().filter(|d| !d.is_empty()) {
        if field.field_type.is_numeric() {
            sql.push_str(&format!(" DEFAULT({default})"));
        } else {
            sql.push_str(&format!(" DEFAULT('{default}')"));
        }
    }
    sql
}

/// One `CREATE INDEX` per indexed field, in field order.
pub fn create_indexes(entity: &Entity) -> Vec<String> {
    let table = entity.table_name();
    entity
        .fields()
        .iter()
        .filter(|f| f.index)
        .map(|f| {
            let order = if f.asc_order { "ASC" } else { "DESC" };
            format!("CREATE INDEX index_{table}_{name} ON {table}({name} {order})", name = f.name)
        })
        .collect()
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT({IDENTITY}) FROM {table}")
}

/// Comma-joined field names, used as the projection of entity reads.
pub fn field_names_csv(fields: &FieldSet) -> String {
    fields.names().join(",")
}

/// `INSERT INTO t(a,b) VALUES (?,?)`, or `INSERT INTO t DEFAULT VALUES`
/// when there are no columns.
pub fn insert(table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES");
    }
    format!(
        "INSERT INTO {table}({}) VALUES ({})",
        columns.join(","),
        placeholders(columns.len())
    )
}

/// `UPDATE t SET a=?,b=?` with an optional `WHERE` clause.
pub fn update(table: &str, columns: &[&str], condition: Option<&str>) -> String {
    let assignments: Vec<String> = columns.iter().map(|c| format!("{c}=?")).collect();
    let sql = format!("UPDATE {table} SET {}", assignments.join(","));
    with_condition(sql, condition)
}

/// `DELETE FROM t`; without a condition every row goes.
pub fn delete(table: &str, condition: Option<&str>) -> String {
    with_condition(format!("DELETE FROM {table}"), condition)
}

/// `SELECT <projection> FROM t` with an optional `WHERE` clause.
pub fn select(table: &str, projection: &str, condition: Option<&str>) -> String {
    with_condition(format!("SELECT {projection} FROM {table}"), condition)
}

fn with_condition(mut sql: String, condition: Option<&str>) -> String {
    if let Some(condition) = condition.filter(|c| !c.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}
