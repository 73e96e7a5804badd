use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use relmap_core::sql;
use relmap_sqlite::{Executor, RawRows, SessionConfig, TRACE_TARGET, existing_tables, user_version};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for query results.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "relmap")]
#[command(about = "Inspect and query relmap SQLite databases")]
struct Cli {
    /// Log level filter used when RUST_LOG is not set (e.g. info, debug).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Trace every executed statement.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute SQL text and print the resulting rows.
    Exec(ExecArgs),
    /// Count the rows of a mapped table.
    Count(CountArgs),
    /// Show the schema version and the tables of a database.
    Status(StatusArgs),
}

/// Where the database comes from: a file path or a session config.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct DatabaseArgs {
    /// Path to the SQLite database file.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Session config YAML naming the database.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ExecArgs {
    #[command(flatten)]
    source: DatabaseArgs,
    /// SQL text to execute.
    sql: String,
    /// Output format for the rows.
    #[arg(long, default_value = "table")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct CountArgs {
    #[command(flatten)]
    source: DatabaseArgs,
    /// Table to count.
    #[arg(long)]
    table: String,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[command(flatten)]
    source: DatabaseArgs,
    /// Print the status as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.debug);

    let result = match cli.command {
        Command::Exec(args) => run_exec(args, cli.debug),
        Command::Count(args) => run_count(args, cli.debug),
        Command::Status(args) => run_status(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_tracing(level: &str, debug: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if debug {
        if let Ok(directive) = format!("{TRACE_TARGET}=debug").parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the database named by `--db` or by the config's `database` key.
///
/// A config with `debug: true` turns the statement trace on as well.
fn open_executor(source: &DatabaseArgs, debug: bool) -> Result<Executor, String> {
    let (database, config_debug) = match (&source.db, &source.config) {
        (Some(path), _) => (path.display().to_string(), false),
        (None, Some(path)) => {
            let config = SessionConfig::load(path)
                .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?;
            (config.database, config.debug)
        }
        (None, None) => return Err("either --db or --config is required".to_string()),
    };

    let conn = if database == relmap_sqlite::IN_MEMORY {
        Connection::open_in_memory()
    } else {
        Connection::open(&database)
    }
    .map_err(|e| format!("Failed to open database '{database}': {e}"))?;

    let executor = Executor::new(conn);
    executor.set_debug(debug || config_debug);
    Ok(executor)
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_exec(args: ExecArgs, debug: bool) -> Result<(), String> {
    let executor = open_executor(&args.source, debug)?;
    let raw = executor
        .execute_raw(&args.sql)
        .map_err(|e| format!("Failed to execute SQL: {e}"))?;

    match args.format {
        CliOutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&rows_to_json(&raw))
                .map_err(|e| format!("Failed to serialize rows: {e}"))?;
            println!("{rendered}");
        }
        CliOutputFormat::Table => print_table(&raw),
    }
    Ok(())
}

fn run_count(args: CountArgs, debug: bool) -> Result<(), String> {
    let executor = open_executor(&args.source, debug)?;
    let raw = executor
        .execute_raw(&sql::count(&args.table))
        .map_err(|e| format!("Failed to count rows of '{}': {e}", args.table))?;

    let count = raw
        .rows
        .first()
        .and_then(|row| row.first().cloned().flatten())
        .unwrap_or_else(|| "0".to_string());
    println!("{count}");
    Ok(())
}

fn run_status(args: StatusArgs) -> Result<(), String> {
    let executor = open_executor(&args.source, false)?;
    let conn = executor.connection();
    let version =
        user_version(conn).map_err(|e| format!("Failed to read schema version: {e}"))?;
    let tables = existing_tables(conn).map_err(|e| format!("Failed to list tables: {e}"))?;

    if args.json {
        let status = serde_json::json!({
            "relmap_version": PACKAGE_VERSION,
            "schema_version": version,
            "tables": tables,
        });
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| format!("Failed to serialize status: {e}"))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Schema version: {version}");
    println!("Tables: {}", tables.len());
    for table in &tables {
        println!("  {table}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn rows_to_json(raw: &RawRows) -> serde_json::Value {
    let rows = raw
        .rows
        .iter()
        .map(|row| {
            let object = raw
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| {
                    let value = value
                        .as_ref()
                        .map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.clone()));
                    (column.clone(), value)
                })
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::Value::Array(rows)
}

fn print_table(raw: &RawRows) {
    if raw.columns.is_empty() {
        return;
    }
    let cells: Vec<Vec<&str>> = raw
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.as_deref().unwrap_or("NULL")).collect())
        .collect();

    let mut widths: Vec<usize> = raw.columns.iter().map(String::len).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<String> = raw
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    println!("{}", header.join(" | ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("-+-"));
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        println!("{}", line.join(" | ").trim_end());
    }
    println!("({} row{})", cells.len(), if cells.len() == 1 { "" } else { "s" });
}
