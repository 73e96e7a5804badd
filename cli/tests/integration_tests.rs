use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn relmap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_relmap"))
        .args(args)
        .output()
        .expect("failed to run relmap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A database with one mapped-style table and two rows, at schema version 2.
fn seeded_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("app.db");
    let conn = rusqlite::Connection::open(&path).expect("failed to open db");
    conn.execute_batch(
        "CREATE TABLE players (id INTEGER PRIMARY KEY AUTOINCREMENT,name TEXT NOT NULL,score REAL);
         INSERT INTO players(name,score) VALUES ('abc',1.5);
         INSERT INTO players(name,score) VALUES ('xyz',NULL);
         PRAGMA user_version = 2;",
    )
    .expect("failed to seed db");
    path
}

fn write_config(dir: &TempDir, database: &Path) -> PathBuf {
    let path = dir.path().join("relmap.yml");
    let yaml = format!("database: {}\nversion: 2\n", database.display());
    fs::write(&path, yaml).expect("failed to write config");
    path
}

// ---------------------------------------------------------------------------
// exec
// ---------------------------------------------------------------------------

#[test]
fn exec_prints_rows_as_table() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);

    let out = relmap(&[
        "exec",
        "--db",
        db.to_str().unwrap(),
        "SELECT name, score FROM players ORDER BY id",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "name | score");
    assert!(lines[2].starts_with("abc"));
    assert!(lines[2].ends_with("1.5"));
    assert!(lines[3].ends_with("NULL"));
    assert_eq!(lines.last(), Some(&"(2 rows)"));
}

#[test]
fn exec_json_keeps_nulls() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);

    let out = relmap(&[
        "exec",
        "--db",
        db.to_str().unwrap(),
        "--format",
        "json",
        "SELECT id, name, score FROM players ORDER BY id",
    ]);
    assert!(out.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "1");
    assert_eq!(rows[0]["name"], "abc");
    assert_eq!(rows[1]["score"], serde_json::Value::Null);
}

#[test]
fn exec_runs_statements_without_rows() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);
    let db = db.to_str().unwrap();

    let out = relmap(&["exec", "--db", db, "DELETE FROM players WHERE name = 'xyz'"]);
    assert!(out.status.success());

    let out = relmap(&["count", "--db", db, "--table", "players"]);
    assert_eq!(stdout(&out).trim(), "1");
}

#[test]
fn exec_invalid_sql_fails() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);

    let out = relmap(&["exec", "--db", db.to_str().unwrap(), "SELEC nonsense"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("error: Failed to execute SQL"));
}

// ---------------------------------------------------------------------------
// count
// ---------------------------------------------------------------------------

#[test]
fn count_reports_rows() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);

    let out = relmap(&["count", "--db", db.to_str().unwrap(), "--table", "players"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "2");
}

#[test]
fn count_unknown_table_fails() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);

    let out = relmap(&["count", "--db", db.to_str().unwrap(), "--table", "ghosts"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("ghosts"));
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

#[test]
fn status_lists_version_and_tables() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);

    let out = relmap(&["status", "--db", db.to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("Schema version: 2"));
    assert!(text.contains("Tables: 1"));
    assert!(text.contains("  players"));
}

#[test]
fn status_reads_database_from_config() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);
    let config = write_config(&dir, &db);

    let out = relmap(&["status", "--config", config.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let status: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(status["schema_version"], 2);
    assert_eq!(status["tables"], serde_json::json!(["players"]));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yml");

    let out = relmap(&["status", "--config", missing.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to load config"));
}

#[test]
fn database_source_is_required() {
    let out = relmap(&["status"]);
    assert!(!out.status.success());
}
