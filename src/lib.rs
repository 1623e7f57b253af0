//! Dialect-aware SQL data types
//!
//! Describe the logical type of a column once and let each SQL engine decide
//! how it is stored, validated, escaped and bound.
//!
//! # Crates
//!
//! - `dtype_core` - descriptors, the value pipeline and record layouts
//! - `postgresql_types` - the PostgreSQL dialect and `postgres-types` conversions
//! - `mysql_types` - the MySQL dialect and `mysql_async` conversions
//! - `sqlite_types` - the SQLite dialect and storage-class conversions
//!
//! # CLI Usage
//!
//! ```bash
//! # CREATE TABLE statements for a YAML record layout
//! dialect-types ddl --engine mysql --schema layout.yaml
//!
//! # Inline literal for one value
//! dialect-types literal --engine postgres --type '{type: array, element: integer}' --value '[1,2]'
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dtype_core::{DialectDdl, NullJsonStringification, TimeZoneSetting, ToDdl};
use std::fmt;
use std::sync::Arc;

pub mod config;

pub use dtype_core;
pub use dtype_core::{DataType, Descriptor, Dialect, TypeSystemOptions, Value};
pub use mysql_types;
pub use postgresql_types;
pub use sqlite_types;

/// SQL engines with a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// PostgreSQL
    #[value(alias = "postgresql")]
    Postgres,
    /// MySQL
    Mysql,
    /// SQLite
    Sqlite,
    /// Engine-neutral dialect with the default capabilities
    Generic,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Postgres => postgresql_types::DIALECT_NAME,
            Engine::Mysql => mysql_types::DIALECT_NAME,
            Engine::Sqlite => sqlite_types::DIALECT_NAME,
            Engine::Generic => "generic",
        }
    }

    pub fn dialect(&self, options: TypeSystemOptions) -> Arc<Dialect> {
        match self {
            Engine::Postgres => postgresql_types::postgres_dialect(options),
            Engine::Mysql => mysql_types::mysql_dialect(options),
            Engine::Sqlite => sqlite_types::sqlite_dialect(options),
            Engine::Generic => Dialect::generic(options),
        }
    }

    /// DDL generator carrying the engine's table options.
    pub fn ddl(&self, options: TypeSystemOptions) -> Box<dyn ToDdl> {
        match self {
            Engine::Postgres => Box::new(postgresql_types::PostgreSQLDdl::new(options)),
            Engine::Mysql => Box::new(mysql_types::MySQLDdl::new(options)),
            Engine::Sqlite => Box::new(sqlite_types::SQLiteDdl::new(options)),
            Engine::Generic => Box::new(DialectDdl::new(&Dialect::generic(options))),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a dialect by engine name, e.g. `"postgres"` or `"sqlite"`.
pub fn dialect_for(name: &str, options: TypeSystemOptions) -> anyhow::Result<Arc<Dialect>> {
    let engine = Engine::from_str(name, true)
        .map_err(|_| anyhow::anyhow!("Unknown SQL engine: {name}"))?;
    Ok(engine.dialect(options))
}

/// Parse a data type written the way record layouts write it,
/// e.g. `bigint` or `{type: string, length: 80}`.
pub fn parse_data_type(input: &str) -> anyhow::Result<DataType> {
    serde_yaml::from_str(input).with_context(|| format!("Invalid data type: {input}"))
}

/// Parse a command-line value as JSON, falling back to the raw text.
pub fn parse_value(input: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(json) => Value::from(json),
        Err(_) => Value::String(input.to_string()),
    }
}

/// Type system options settable from the command line.
#[derive(Parser, Clone, Debug, Default)]
pub struct TypeOpts {
    /// Time zone for DATE values: a `+HH:MM` offset or an IANA name
    #[arg(long, env = "DIALECT_TYPES_TIMEZONE")]
    pub timezone: Option<TimeZoneSetting>,

    /// Meaning of a null value in JSON columns
    #[arg(long, env = "DIALECT_TYPES_NULL_JSON")]
    pub null_json: Option<NullJsonStringification>,
}

impl TypeOpts {
    /// Apply the flags that were given on top of `options`.
    pub fn apply(&self, mut options: TypeSystemOptions) -> TypeSystemOptions {
        if let Some(timezone) = self.timezone {
            options.timezone = timezone;
        }
        if let Some(null_json) = self.null_json {
            options.null_json_stringification = null_json;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_for_known_engines() {
        for (name, expected) in [
            ("postgres", "postgres"),
            ("PostgreSQL", "postgres"),
            ("mysql", "mysql"),
            ("sqlite", "sqlite"),
            ("generic", "generic"),
        ] {
            let dialect = dialect_for(name, TypeSystemOptions::default()).unwrap();
            assert_eq!(dialect.name(), expected, "engine {name}");
        }
    }

    #[test]
    fn test_dialect_for_unknown_engine() {
        let err = dialect_for("oracle", TypeSystemOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown SQL engine: oracle");
    }

    #[test]
    fn test_parse_data_type() {
        assert_eq!(parse_data_type("bigint").unwrap(), DataType::bigint());
        assert_eq!(
            parse_data_type("{type: string, length: 80}").unwrap(),
            DataType::string(80)
        );
        let err = parse_data_type("{type: nosuch}").unwrap_err();
        assert!(err.to_string().starts_with("Invalid data type"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Value::from(42));
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("\"quoted\""), Value::from("quoted"));
        assert_eq!(parse_value("plain text"), Value::from("plain text"));
        assert_eq!(
            parse_value("[1, 2]"),
            Value::Array(vec![Value::from(1), Value::from(2)])
        );
    }

    #[test]
    fn test_type_opts_override() {
        let opts = TypeOpts {
            timezone: Some("+02:00".parse().unwrap()),
            null_json: None,
        };
        let options = opts.apply(TypeSystemOptions {
            null_json_stringification: NullJsonStringification::Sql,
            ..Default::default()
        });
        assert_eq!(options.timezone.to_string(), "+02:00");
        assert_eq!(
            options.null_json_stringification,
            NullJsonStringification::Sql
        );
    }
}
