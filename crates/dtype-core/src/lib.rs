//! Core of the dialect-aware data type system.
//!
//! This crate provides the engine-independent pieces:
//!
//! - [`DataType`] / [`TypeId`] - Logical types and their declared options
//! - [`Descriptor`] - A logical type bound (or not yet) to a dialect and a field
//! - [`Dialect`] - Capability table, escaping rules and per-engine overrides
//! - [`Value`] - Host values flowing through the pipeline
//! - [`produce_sql_fragment`] - The escape/bind boundary
//! - [`DatabaseSchema`] - Record layouts loaded from YAML, rendered by [`ddl`]
//!
//! # Architecture
//!
//! ```text
//! dtype-core (this crate)
//!    │
//!    ├─── postgresql-types    (PostgreSQL dialect + postgres-types conversion)
//!    ├─── mysql-types         (MySQL dialect + mysql_async conversion)
//!    └─── sqlite-types        (SQLite dialect)
//! ```
//!
//! # Example
//!
//! ```rust
//! use dtype_core::{DataType, Descriptor, Dialect, TypeSystemOptions, Value};
//!
//! let dialect = Dialect::generic(TypeSystemOptions::default());
//! let column = Descriptor::new(DataType::string(20));
//! let bound = column.specialize(&dialect)?;
//! assert_eq!(bound.describe_storage_type()?, "VARCHAR(20)");
//! assert_eq!(bound.to_inline_literal(&Value::from("it's"))?, "'it''s'");
//! # Ok::<(), dtype_core::TypeError>(())
//! ```

pub mod config;
pub mod ddl;
pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod geojson;
pub mod kinds;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod usage;
pub mod values;

// Re-exports for convenience
pub use config::{ConfigError, NullJsonStringification, TimeZoneSetting, TypeSystemOptions};
pub use ddl::{create_table, DialectDdl, ToDdl};
pub use descriptor::{CheckConstraint, Descriptor, Fallback, Specialization, TypeBehavior};
pub use dialect::{
    CapabilityTable, CitextSupport, DecimalCapabilities, Dialect, DialectBuilder,
    FloatCapabilities, IntegerCapabilities, SqlEscaper, StandardEscaper,
};
pub use error::{Result, TypeError};
pub use pipeline::{infer_data_type, produce_sql_fragment, BindCollector, BindParams};
pub use schema::{ColumnDefinition, DatabaseSchema, SchemaError, TableDefinition};
pub use types::{DataType, GeometryType, LengthClass, TypeId, UuidVersion};
pub use usage::UsageContext;
pub use values::{RangeBound, RangeValue, Value};
