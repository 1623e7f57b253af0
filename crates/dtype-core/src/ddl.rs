//! DDL and DML generation from finalized record layouts.
//!
//! Column types come from [`Descriptor::describe_storage_type`], so every
//! downgrade a dialect applied is already reflected in the output. Fallbacks
//! that rely on a CHECK constraint get it appended to the column definition.

use crate::descriptor::Descriptor;
use crate::dialect::Dialect;
use crate::error::TypeError;
use crate::pipeline::{produce_sql_fragment, BindCollector};
use crate::schema::{ColumnDefinition, SchemaError, TableDefinition};
use crate::values::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

fn column_error(table: &str, column: &str) -> impl Fn(TypeError) -> SchemaError {
    let table = table.to_string();
    let column = column.to_string();
    move |source| SchemaError::Type {
        table: table.clone(),
        column: column.clone(),
        source,
    }
}

/// Trait for generating DDL for one dialect.
pub trait ToDdl {
    /// Dialect the statements are written for.
    fn dialect(&self) -> &Arc<Dialect>;

    /// Column type for a descriptor, specializing it first when needed.
    fn to_ddl(&self, descriptor: &Descriptor) -> Result<String, TypeError> {
        descriptor.specialize(self.dialect())?.describe_storage_type()
    }

    /// Trailing table options, e.g. a storage engine clause.
    fn table_options(&self) -> Option<String> {
        None
    }

    /// One column definition of a finalized table.
    fn column_definition(&self, column: &ColumnDefinition) -> Result<String, TypeError> {
        let dialect = self.dialect();
        let descriptor = &column.column_type;
        let quoted = dialect.quote_identifier(&column.name);

        let mut sql = format!("{quoted} {}", self.to_ddl(descriptor)?);
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = column.default_value() {
            sql.push_str(" DEFAULT ");
            sql.push_str(&descriptor.to_inline_literal(&default)?);
        }
        if let Some(constraint) = descriptor.fallback().and_then(|f| f.constraint.as_ref()) {
            sql.push_str(&format!(" CHECK ({})", constraint.to_sql(&quoted, dialect)));
        }
        Ok(sql)
    }

    /// Statements creating `table`: dependent types first, then `CREATE TABLE`.
    fn to_create_table(&self, table: &TableDefinition) -> Result<Vec<String>, SchemaError> {
        let dialect = self.dialect();
        let mut table = table.clone();
        table.finalize(dialect)?;

        let mut statements = Vec::new();
        let mut definitions = Vec::new();
        for column in table.columns.iter().filter(|c| !c.is_virtual()) {
            let wrap = column_error(&table.name, &column.name);
            if let Some(statement) = column.column_type.dependent_ddl().map_err(&wrap)? {
                statements.push(statement);
            }
            definitions.push(self.column_definition(column).map_err(&wrap)?);
        }

        if let Some(pk) = &table.primary_key {
            if table.get_column(pk).is_none() {
                return Err(SchemaError::ColumnNotFound {
                    table: table.name.clone(),
                    column: pk.clone(),
                });
            }
            definitions.push(format!("PRIMARY KEY ({})", dialect.quote_identifier(pk)));
        }

        let suffix = self
            .table_options()
            .map(|options| format!(" {options}"))
            .unwrap_or_default();
        statements.push(format!(
            "CREATE TABLE {} (\n  {}\n){suffix};",
            dialect.quote_identifier(&table.name),
            definitions.join(",\n  ")
        ));
        Ok(statements)
    }

    /// `INSERT` for one row, binding every value through `params`.
    ///
    /// Columns missing from `row` are left out; unknown keys are an error.
    fn to_insert(
        &self,
        table: &TableDefinition,
        row: &BTreeMap<String, Value>,
        params: &mut dyn BindCollector,
    ) -> Result<String, SchemaError> {
        let dialect = self.dialect();
        if let Some(unknown) = row.keys().find(|k| table.get_column(k).is_none()) {
            return Err(SchemaError::ColumnNotFound {
                table: table.name.clone(),
                column: unknown.clone(),
            });
        }

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for column in table.columns.iter().filter(|c| !c.is_virtual()) {
            let Some(value) = row.get(&column.name) else {
                continue;
            };
            let fragment = produce_sql_fragment(
                dialect,
                Some(&column.column_type),
                value,
                Some(&mut *params),
            )
            .map_err(column_error(&table.name, &column.name))?;
            columns.push(dialect.quote_identifier(&column.name));
            values.push(fragment);
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({});",
            dialect.quote_identifier(&table.name),
            columns.join(", "),
            values.join(", ")
        ))
    }
}

/// DDL generator for any dialect without engine-specific table options.
#[derive(Debug, Clone)]
pub struct DialectDdl {
    dialect: Arc<Dialect>,
}

impl DialectDdl {
    pub fn new(dialect: &Arc<Dialect>) -> Self {
        Self {
            dialect: Arc::clone(dialect),
        }
    }
}

impl ToDdl for DialectDdl {
    fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }
}

/// `CREATE TABLE` (and the types it depends on) for `table` on `dialect`.
pub fn create_table(
    dialect: &Arc<Dialect>,
    table: &TableDefinition,
) -> Result<Vec<String>, SchemaError> {
    DialectDdl::new(dialect).to_create_table(table)
}
