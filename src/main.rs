//! Command-line interface for dialect-types
//!
//! # Usage Examples
//!
//! ## DDL
//! ```bash
//! # CREATE TABLE statements for every table of a layout
//! dialect-types ddl --engine postgres --schema layout.yaml
//!
//! # Only one table, with DATE columns rendered in Berlin time
//! dialect-types --timezone Europe/Berlin ddl --engine mysql --schema layout.yaml --table users
//! ```
//!
//! ## Single values
//! ```bash
//! # Storage type and fallback for a type
//! dialect-types describe --engine sqlite --type '{type: integer, unsigned: true}'
//!
//! # Inline literal, or placeholder plus bound parameters with --bind
//! dialect-types literal --engine mysql --type json --value '{"a": 1}'
//! dialect-types literal --engine postgres --type '{type: range, subtype: integer}' --value '[1, 5]' --bind
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialect_types::config::load_options;
use dialect_types::{parse_data_type, parse_value, Descriptor, Engine, TypeOpts};
use dtype_core::{produce_sql_fragment, BindParams, DatabaseSchema};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "dialect-types")]
#[command(about = "Render dialect-specific SQL for logical data types")]
#[command(long_about = None)]
struct Cli {
    /// YAML file with type system options
    #[arg(long, global = true, env = "DIALECT_TYPES_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    type_opts: TypeOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print CREATE TABLE statements for a record layout
    Ddl {
        /// Target SQL engine
        #[arg(long, value_enum)]
        engine: Engine,

        /// Record layout YAML file
        #[arg(long)]
        schema: PathBuf,

        /// Only render this table
        #[arg(long)]
        table: Option<String>,
    },

    /// Print the storage type of a data type and any fallback applied
    Describe {
        /// Target SQL engine
        #[arg(long, value_enum)]
        engine: Engine,

        /// Data type, e.g. `bigint` or `{type: string, length: 80}`
        #[arg(long = "type")]
        data_type: String,
    },

    /// Print the SQL for one value
    Literal {
        /// Target SQL engine
        #[arg(long, value_enum)]
        engine: Engine,

        /// Data type; inferred from the value when omitted
        #[arg(long = "type")]
        data_type: Option<String>,

        /// Value as JSON; anything that is not JSON is taken as a string
        #[arg(long)]
        value: String,

        /// Bind the value as a parameter instead of inlining it
        #[arg(long)]
        bind: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = load_options(cli.config.as_deref(), &cli.type_opts)?;

    match cli.command {
        Commands::Ddl {
            engine,
            schema,
            table,
        } => {
            let layout = DatabaseSchema::from_file(&schema)
                .with_context(|| format!("Failed to load schema from {}", schema.display()))?;
            let ddl = engine.ddl(options);
            let tables: Vec<_> = match &table {
                Some(name) => vec![layout
                    .get_table(name)
                    .with_context(|| format!("Table not found: {name}"))?],
                None => layout.tables.iter().collect(),
            };
            info!(engine = %engine, tables = tables.len(), "rendering DDL");
            for table in tables {
                for statement in ddl.to_create_table(table)? {
                    println!("{statement}");
                }
            }
        }
        Commands::Describe { engine, data_type } => {
            let dialect = engine.dialect(options);
            let descriptor = Descriptor::new(parse_data_type(&data_type)?);
            let bound = descriptor.specialize(&dialect)?;
            println!("{}", bound.describe_storage_type()?);
            if let Some(fallback) = bound.fallback() {
                println!("-- {}", fallback.reason);
                if let Some(constraint) = &fallback.constraint {
                    println!("-- CHECK ({})", constraint.to_sql("value", &dialect));
                }
            }
        }
        Commands::Literal {
            engine,
            data_type,
            value,
            bind,
        } => {
            let dialect = engine.dialect(options);
            let descriptor = data_type
                .as_deref()
                .map(parse_data_type)
                .transpose()?
                .map(Descriptor::new);
            let value = parse_value(&value);
            if bind {
                let mut params = BindParams::new(&dialect);
                let sql =
                    produce_sql_fragment(&dialect, descriptor.as_ref(), &value, Some(&mut params))?;
                println!("{sql}");
                for (i, param) in params.values().iter().enumerate() {
                    println!("-- {}: {param}", i + 1);
                }
            } else {
                println!(
                    "{}",
                    produce_sql_fragment(&dialect, descriptor.as_ref(), &value, None)?
                );
            }
        }
    }

    Ok(())
}
