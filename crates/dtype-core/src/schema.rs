//! Record layouts: tables of typed columns.
//!
//! A layout is usually loaded from YAML:
//!
//! ```yaml
//! tables:
//!   - name: users
//!     primary_key: id
//!     columns:
//!       - name: id
//!         type: bigint
//!       - name: email
//!         type: { type: string, length: 120 }
//!       - name: role
//!         type: { type: enum, values: [admin, user] }
//!         default: user
//! ```
//!
//! [`TableDefinition::finalize`] binds every column descriptor to its
//! `table#column` usage context and specializes it for a dialect. Rendering
//! the layout as DDL is left to [`crate::ddl`].

use crate::descriptor::Descriptor;
use crate::dialect::Dialect;
use crate::error::TypeError;
use crate::usage::UsageContext;
use crate::values::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for layout operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading layout file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A column type cannot be used on the target dialect
    #[error("Column '{column}' of table '{table}': {source}")]
    Type {
        table: String,
        column: String,
        #[source]
        source: TypeError,
    },

    /// Table not found in layout
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Column not found in table
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },
}

// ============================================================================
// Definitions
// ============================================================================

/// A single column: name, logical type and nullability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: Descriptor,

    /// Whether this column is nullable
    #[serde(default)]
    pub nullable: bool,

    /// Default value, rendered as an inline literal in DDL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: impl Into<Descriptor>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: false,
            default: None,
        }
    }

    pub fn nullable(name: impl Into<String>, column_type: impl Into<Descriptor>) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, column_type)
        }
    }

    /// Default value as a host value.
    pub fn default_value(&self) -> Option<Value> {
        self.default.clone().map(Value::from_json)
    }

    pub fn is_virtual(&self) -> bool {
        self.column_type.type_id() == crate::types::TypeId::Virtual
    }
}

/// A table and its columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name
    pub name: String,

    /// Primary key column, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,

    /// Column definitions in declaration order
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            columns,
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get all column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Bind every column to its usage context and specialize it for `dialect`.
    ///
    /// A descriptor that already belongs to another field is copied rather
    /// than rebound. Declared defaults are validated against the column type.
    pub fn finalize(&mut self, dialect: &Arc<Dialect>) -> Result<(), SchemaError> {
        let table = self.name.clone();
        for column in &mut self.columns {
            let wrap = |source: TypeError| SchemaError::Type {
                table: table.clone(),
                column: column.name.clone(),
                source,
            };
            let context = UsageContext::new(&table, &column.name);
            let attached = match column.column_type.clone().attach_usage_context(context.clone()) {
                Ok(attached) => attached,
                Err(TypeError::ConflictingUsage { .. }) => column
                    .column_type
                    .with_usage_context(context)
                    .map_err(wrap)?,
                Err(e) => return Err(wrap(e)),
            };
            let bound = attached.specialize(dialect).map_err(wrap)?.into_owned();
            if let Some(default) = column.default_value() {
                bound.validate(&default).map_err(wrap)?;
            }
            column.column_type = bound;
        }
        debug!(
            table = %self.name,
            dialect = dialect.name(),
            columns = self.columns.len(),
            "finalized table definition"
        );
        Ok(())
    }
}

/// A collection of tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Table definitions
    pub tables: Vec<TableDefinition>,

    /// Cached table lookup (not serialized)
    #[serde(skip)]
    table_map: HashMap<String, usize>,
}

impl DatabaseSchema {
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        let mut schema = Self {
            tables,
            table_map: HashMap::new(),
        };
        schema.build_table_map();
        schema
    }

    /// Load a layout from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a layout from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let mut schema: DatabaseSchema = serde_yaml::from_str(yaml)?;
        schema.build_table_map();
        Ok(schema)
    }

    fn build_table_map(&mut self) {
        self.table_map = self
            .tables
            .iter()
            .enumerate()
            .map(|(idx, table)| (table.name.clone(), idx))
            .collect();
    }

    pub fn get_table(&self, name: &str) -> Option<&TableDefinition> {
        self.table_map
            .get(name)
            .and_then(|&idx| self.tables.get(idx))
    }

    /// Get the descriptor of a column in a specific table.
    pub fn get_column_type(&self, table: &str, column: &str) -> Result<&Descriptor, SchemaError> {
        let table_schema = self
            .get_table(table)
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))?;

        table_schema
            .get_column(column)
            .map(|c| &c.column_type)
            .ok_or_else(|| SchemaError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn add_table(&mut self, table: TableDefinition) {
        let idx = self.tables.len();
        self.table_map.insert(table.name.clone(), idx);
        self.tables.push(table);
    }

    /// Finalize every table for `dialect`.
    pub fn finalize(&mut self, dialect: &Arc<Dialect>) -> Result<(), SchemaError> {
        for table in &mut self.tables {
            table.finalize(dialect)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeSystemOptions;
    use crate::types::{DataType, TypeId};
    use std::io::Write;

    const LAYOUT: &str = r#"
tables:
  - name: users
    primary_key: id
    columns:
      - name: id
        type: bigint
      - name: email
        type: { type: string, length: 120 }
      - name: role
        type: { type: enum, values: [admin, user] }
        default: user
      - name: nickname
        type: text
        nullable: true
  - name: posts
    columns:
      - name: title
        type: string
      - name: scores
        type: { type: array, element: integer }
"#;

    fn generic() -> Arc<Dialect> {
        Dialect::generic(TypeSystemOptions::default())
    }

    #[test]
    fn test_parse_layout() {
        let schema = DatabaseSchema::from_yaml(LAYOUT).unwrap();
        assert_eq!(schema.table_names(), vec!["users", "posts"]);
        let users = schema.get_table("users").unwrap();
        assert_eq!(users.primary_key.as_deref(), Some("id"));
        assert_eq!(
            users.column_names(),
            vec!["id", "email", "role", "nickname"]
        );
        assert!(users.get_column("nickname").unwrap().nullable);
        assert_eq!(
            schema.get_column_type("users", "email").unwrap().data_type(),
            &DataType::string(120)
        );
        assert_eq!(
            schema.get_column_type("posts", "scores").unwrap().type_id(),
            TypeId::Array
        );
        assert!(matches!(
            schema.get_column_type("comments", "id"),
            Err(SchemaError::TableNotFound(_))
        ));
        assert!(matches!(
            schema.get_column_type("users", "age"),
            Err(SchemaError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_finalize_binds_usage_and_dialect() {
        let dialect = generic();
        let mut schema = DatabaseSchema::from_yaml(LAYOUT).unwrap();
        let mut users = schema.get_table("users").unwrap().clone();
        users.finalize(&dialect).unwrap();
        for column in &users.columns {
            assert!(column.column_type.is_bound_to(&dialect));
            assert_eq!(
                column.column_type.usage_context(),
                Some(&UsageContext::new("users", &column.name))
            );
        }

        // The generic dialect has no arrays
        let err = schema.finalize(&dialect).unwrap_err();
        assert!(err.to_string().starts_with("Column 'scores' of table 'posts'"));
    }

    #[test]
    fn test_finalize_copies_shared_descriptors() {
        let shared = Descriptor::new(DataType::string(40))
            .attach_usage_context(UsageContext::new("people", "first_name"))
            .unwrap();
        let mut table = TableDefinition::new(
            "people",
            vec![
                ColumnDefinition::new("first_name", shared.clone()),
                ColumnDefinition::new("last_name", shared),
            ],
        );
        table.finalize(&generic()).unwrap();
        assert_eq!(
            table.columns[1].column_type.usage_context().unwrap().field,
            "last_name"
        );
    }

    #[test]
    fn test_finalize_validates_defaults() {
        let mut table = TableDefinition::new(
            "users",
            vec![ColumnDefinition {
                default: Some(serde_json::json!("root")),
                ..ColumnDefinition::new(
                    "role",
                    DataType::enumeration(["admin", "user"]).unwrap(),
                )
            }],
        );
        let err = table.finalize(&generic()).unwrap_err();
        match err {
            SchemaError::Type { source, .. } => assert!(source.is_type_mismatch()),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LAYOUT.as_bytes()).unwrap();
        let schema = DatabaseSchema::from_file(file.path()).unwrap();
        assert_eq!(schema.tables.len(), 2);
        assert!(DatabaseSchema::from_file("/nonexistent/layout.yaml").is_err());
    }
}
