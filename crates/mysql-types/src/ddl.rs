//! MySQL DDL generation.

use crate::dialect::mysql_dialect;
use dtype_core::{Dialect, ToDdl, TypeSystemOptions};
use std::sync::Arc;

/// MySQL DDL generator. Tables are created with the InnoDB engine.
#[derive(Debug, Clone)]
pub struct MySQLDdl {
    dialect: Arc<Dialect>,
}

impl MySQLDdl {
    pub fn new(options: TypeSystemOptions) -> Self {
        Self {
            dialect: mysql_dialect(options),
        }
    }
}

impl Default for MySQLDdl {
    fn default() -> Self {
        Self::new(TypeSystemOptions::default())
    }
}

impl ToDdl for MySQLDdl {
    fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    fn table_options(&self) -> Option<String> {
        Some("ENGINE=InnoDB".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtype_core::types::{IntegerOptions, TimeOptions};
    use dtype_core::{
        BindParams, ColumnDefinition, DataType, Descriptor, TableDefinition, TypeId, Value,
    };
    use std::collections::BTreeMap;

    fn ddl_for(data_type: DataType) -> String {
        MySQLDdl::default()
            .to_ddl(&Descriptor::new(data_type))
            .unwrap()
    }

    #[test]
    fn test_scalar_ddl() {
        assert_eq!(ddl_for(DataType::boolean()), "TINYINT(1)");
        assert_eq!(ddl_for(DataType::integer()), "INTEGER");
        assert_eq!(ddl_for(DataType::bigint()), "BIGINT");
        assert_eq!(ddl_for(DataType::float()), "FLOAT");
        assert_eq!(ddl_for(DataType::double()), "DOUBLE PRECISION");
        assert_eq!(ddl_for(DataType::decimal(10, 2).unwrap()), "DECIMAL(10, 2)");
        assert_eq!(ddl_for(DataType::string(255)), "VARCHAR(255)");
        assert_eq!(ddl_for(DataType::text()), "TEXT");
        assert_eq!(ddl_for(DataType::blob()), "BLOB");
        assert_eq!(ddl_for(DataType::uuid()), "CHAR(36) BINARY");
        assert_eq!(ddl_for(DataType::json()), "JSON");
        assert_eq!(ddl_for(DataType::dateonly()), "DATE");
        assert_eq!(ddl_for(DataType::date()), "DATETIME");
        assert_eq!(
            ddl_for(DataType::Time(TimeOptions { precision: Some(6) })),
            "TIME(6)"
        );
    }

    #[test]
    fn test_create_table() {
        let table = TableDefinition::new(
            "accounts",
            vec![
                ColumnDefinition::new(
                    "id",
                    DataType::integer_of(
                        TypeId::Integer,
                        IntegerOptions {
                            unsigned: true,
                            ..Default::default()
                        },
                    )
                    .unwrap(),
                ),
                ColumnDefinition::new("status", DataType::enumeration(["open", "closed"]).unwrap()),
                ColumnDefinition::new("active", DataType::boolean()),
                ColumnDefinition::nullable("external_id", DataType::uuid()),
            ],
        )
        .with_primary_key("id");

        let statements = MySQLDdl::default().to_create_table(&table).unwrap();
        assert_eq!(
            statements,
            vec![concat!(
                "CREATE TABLE `accounts` (\n",
                "  `id` INTEGER UNSIGNED NOT NULL,\n",
                "  `status` ENUM('open', 'closed') NOT NULL,\n",
                "  `active` TINYINT(1) NOT NULL,\n",
                "  `external_id` CHAR(36) BINARY CHECK (`external_id` LIKE '________-____-____-____-____________'),\n",
                "  PRIMARY KEY (`id`)\n",
                ") ENGINE=InnoDB;"
            )
            .to_string()]
        );
    }

    #[test]
    fn test_insert_uses_question_marks() {
        let ddl = MySQLDdl::default();
        let mut table = TableDefinition::new(
            "events",
            vec![
                ColumnDefinition::new("id", DataType::integer()),
                ColumnDefinition::new("happened_at", DataType::date()),
                ColumnDefinition::new("done", DataType::boolean()),
            ],
        );
        table.finalize(ddl.dialect()).unwrap();

        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::from(1));
        row.insert(
            "happened_at".to_string(),
            Value::from("2024-05-01T12:00:00Z"),
        );
        row.insert("done".to_string(), Value::Bool(true));
        let mut params = BindParams::new(ddl.dialect());
        let sql = ddl.to_insert(&table, &row, &mut params).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `events` (`id`, `happened_at`, `done`) VALUES (?, ?, ?);"
        );
        assert_eq!(
            params.into_values(),
            vec![
                Value::from(1),
                Value::from("2024-05-01 12:00:00.000"),
                Value::from(1),
            ]
        );
    }
}
