//! Notelite CLI - process note blocks against a database
//!
//! Stands in for the host application: loads a database (embedded file
//! or remote HTTP service), seeds the selection state, and runs blocks
//! or inspection commands.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use notelite::db::{Backend, EmbeddedDb, RemoteDb};
use notelite::state::{Period, SelectionState};
use notelite::Engine;

#[derive(Parser)]
#[command(name = "notelite")]
#[command(about = "Database-backed note blocks and widgets", long_about = None)]
struct Cli {
    /// Embedded database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Remote query service base URL (POST /query and /execute)
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Selected date for placeholder resolution (YYYY-MM-DD, default today)
    #[arg(long, global = true)]
    date: Option<String>,

    /// Navigation period: day, week, month, quarter or year
    #[arg(long, global = true, default_value = "day")]
    period: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a row-query block (file path, or - for stdin)
    Query { source: String },

    /// Process a chart block and print its chart data as JSON
    Chart { source: String },

    /// Show the column structure of a table
    Inspect { table: String },

    /// List user tables
    Tables,

    /// Run a raw SQL statement
    Sql { statement: String },

    /// Print a counter widget's current value
    Counter {
        /// Natural-key value (e.g. the habit name)
        key: String,
        table: String,
        #[arg(long, default_value = "habit")]
        key_column: String,
        #[arg(long, default_value = "count")]
        value_column: String,
        #[arg(long, default_value = "date")]
        date_column: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let backend = match (&cli.db, &cli.remote) {
        (Some(path), None) => Backend::Embedded(
            EmbeddedDb::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        (None, Some(url)) => Backend::Remote(RemoteDb::new(url.clone())),
        _ => bail!("provide exactly one of --db or --remote"),
    };

    let period: Period = cli
        .period
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let state = SelectionState::today();
    if let Some(date) = &cli.date {
        state.set_selected_date_str(date);
    }
    state.set_period(period);

    let engine = Engine::with_state(backend, state);

    match cli.command {
        Commands::Query { source } => {
            let block = read_block_source(&source)?;
            let output = engine.process_query_block(&block).await?;
            if output.rows.is_empty() {
                println!("No rows found.");
            } else {
                println!("{}", output.to_display_string());
            }
        }
        Commands::Chart { source } => {
            let block = read_block_source(&source)?;
            let chart = engine.process_chart_block(&block).await?;
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }
        Commands::Inspect { table } => {
            let columns = engine.inspect_table(&table).await?;
            if columns.is_empty() {
                println!("Table '{}' does not exist or has no columns.", table);
            } else {
                println!("Structure of '{}':", table);
                for column in columns {
                    let mut flags = Vec::new();
                    if column.primary_key {
                        flags.push("PRIMARY KEY");
                    }
                    if column.not_null {
                        flags.push("NOT NULL");
                    }
                    let flags = if flags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", flags.join(", "))
                    };
                    println!("  {} {}{}", column.name, column.column_type, flags);
                }
            }
        }
        Commands::Tables => {
            let tables = engine.tables().await?;
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                for table in tables {
                    println!("{table}");
                }
            }
        }
        Commands::Sql { statement } => {
            if is_read_statement(&statement) {
                let rows = engine.execute_sql(&statement, &[]).await?;
                let output = notelite::render::QueryOutput {
                    rows,
                    format: blockql::DisplayFormat::Table,
                };
                println!("{}", output.to_display_string());
            } else {
                engine.run_sql(&statement, &[]).await?;
                println!("OK");
            }
        }
        Commands::Counter {
            key,
            table,
            key_column,
            value_column,
            date_column,
        } => {
            let attrs: HashMap<String, String> = [
                ("key", key.as_str()),
                ("table", table.as_str()),
                ("key-column", key_column.as_str()),
                ("value-column", value_column.as_str()),
                ("date-column", date_column.as_str()),
                ("date", "@date"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

            let mut widget = engine.counter(&attrs);
            widget.load().await;
            println!("{} = {}", key, widget.display());
        }
    }

    Ok(())
}

fn read_block_source(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
    }
}

fn is_read_statement(statement: &str) -> bool {
    let head = statement
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(head.as_str(), "select" | "pragma" | "explain" | "with")
}
