//! PostgreSQL DDL generation.
//!
//! Column types, enum types and CHECK constraints all come from the shared
//! [`ToDdl`] implementation; this module adds PostgreSQL-only statements.

use crate::dialect::postgres_dialect;
use dtype_core::{Dialect, SchemaError, TableDefinition, ToDdl, TypeSystemOptions};
use std::sync::Arc;

/// PostgreSQL DDL generator.
#[derive(Debug, Clone)]
pub struct PostgreSQLDdl {
    dialect: Arc<Dialect>,
}

impl PostgreSQLDdl {
    pub fn new(options: TypeSystemOptions) -> Self {
        Self {
            dialect: postgres_dialect(options),
        }
    }

    /// Generate a batch INSERT statement using UNNEST.
    ///
    /// Each parameter is an array holding one column's values for every row:
    /// `INSERT INTO t (a, b) SELECT * FROM UNNEST($1::type[], $2::type[])`
    pub fn to_batch_insert_unnest(&self, table: &TableDefinition) -> Result<String, SchemaError> {
        let mut table = table.clone();
        table.finalize(&self.dialect)?;

        let mut names = Vec::new();
        let mut params = Vec::new();
        for column in table.columns.iter().filter(|c| !c.is_virtual()) {
            let storage = self
                .to_ddl(&column.column_type)
                .map_err(|source| SchemaError::Type {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    source,
                })?;
            names.push(self.dialect.quote_identifier(&column.name));
            params.push(format!("${}::{storage}[]", params.len() + 1));
        }

        Ok(format!(
            "INSERT INTO {} ({}) SELECT * FROM UNNEST({})",
            self.dialect.quote_identifier(&table.name),
            names.join(", "),
            params.join(", ")
        ))
    }
}

impl Default for PostgreSQLDdl {
    fn default() -> Self {
        Self::new(TypeSystemOptions::default())
    }
}

impl ToDdl for PostgreSQLDdl {
    fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtype_core::types::IntegerOptions;
    use dtype_core::{BindParams, ColumnDefinition, DataType, Descriptor, TypeId, Value};
    use std::collections::BTreeMap;

    fn ddl_for(data_type: DataType) -> String {
        PostgreSQLDdl::default()
            .to_ddl(&Descriptor::new(data_type))
            .unwrap()
    }

    #[test]
    fn test_scalar_ddl() {
        assert_eq!(ddl_for(DataType::boolean()), "BOOLEAN");
        assert_eq!(ddl_for(DataType::integer()), "INTEGER");
        assert_eq!(ddl_for(DataType::bigint()), "BIGINT");
        assert_eq!(ddl_for(DataType::float()), "REAL");
        assert_eq!(ddl_for(DataType::double()), "DOUBLE PRECISION");
        assert_eq!(ddl_for(DataType::decimal(10, 2).unwrap()), "DECIMAL(10, 2)");
        assert_eq!(ddl_for(DataType::string(255)), "VARCHAR(255)");
        assert_eq!(ddl_for(DataType::char(10)), "CHAR(10)");
        assert_eq!(ddl_for(DataType::text()), "TEXT");
        assert_eq!(ddl_for(DataType::blob()), "BYTEA");
        assert_eq!(ddl_for(DataType::uuid()), "UUID");
        assert_eq!(ddl_for(DataType::json()), "JSON");
        assert_eq!(ddl_for(DataType::Jsonb(Default::default())), "JSONB");
        assert_eq!(ddl_for(DataType::dateonly()), "DATE");
        assert_eq!(ddl_for(DataType::date()), "TIMESTAMP WITH TIME ZONE");
    }

    #[test]
    fn test_array_ddl() {
        assert_eq!(ddl_for(DataType::array(DataType::integer())), "INTEGER[]");
        assert_eq!(
            ddl_for(DataType::array(DataType::array(DataType::text()))),
            "TEXT[][]"
        );
    }

    #[test]
    fn test_create_table_with_enum_type() {
        let table = TableDefinition::new(
            "users",
            vec![
                ColumnDefinition::new("id", DataType::bigint()),
                ColumnDefinition::new("role", DataType::enumeration(["admin", "member"]).unwrap()),
                ColumnDefinition::new(
                    "level",
                    DataType::integer_of(TypeId::TinyInt, IntegerOptions::default()).unwrap(),
                ),
            ],
        )
        .with_primary_key("id");

        let statements = PostgreSQLDdl::default().to_create_table(&table).unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE TYPE \"enum_users_role\" AS ENUM('admin', 'member');".to_string(),
                concat!(
                    "CREATE TABLE \"users\" (\n",
                    "  \"id\" BIGINT NOT NULL,\n",
                    "  \"role\" \"enum_users_role\" NOT NULL,\n",
                    "  \"level\" SMALLINT NOT NULL CHECK (\"level\" BETWEEN -128 AND 127),\n",
                    "  PRIMARY KEY (\"id\")\n",
                    ");"
                )
                .to_string(),
            ]
        );
    }

    #[test]
    fn test_insert_uses_numbered_placeholders() {
        let ddl = PostgreSQLDdl::default();
        let mut table = TableDefinition::new(
            "events",
            vec![
                ColumnDefinition::new("id", DataType::integer()),
                ColumnDefinition::new("during", DataType::range(DataType::integer())),
            ],
        );
        table.finalize(ddl.dialect()).unwrap();

        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::from(1));
        row.insert(
            "during".to_string(),
            Value::Array(vec![Value::from(1), Value::from(4)]),
        );
        let mut params = BindParams::new(ddl.dialect());
        let sql = ddl.to_insert(&table, &row, &mut params).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"events\" (\"id\", \"during\") VALUES ($1, $2::int4range);"
        );
        assert_eq!(
            params.into_values(),
            vec![Value::from(1), Value::from("[1,4)")]
        );
    }

    #[test]
    fn test_batch_insert_unnest() {
        let table = TableDefinition::new(
            "items",
            vec![
                ColumnDefinition::new("id", DataType::bigint()),
                ColumnDefinition::new("name", DataType::text()),
            ],
        );
        let sql = PostgreSQLDdl::default()
            .to_batch_insert_unnest(&table)
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"items\" (\"id\", \"name\") SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[])"
        );
    }
}
