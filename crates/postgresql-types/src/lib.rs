//! PostgreSQL dialect for dtype-core data types.
//!
//! # Modules
//!
//! - [`dialect`] - Capabilities, escaping and the PostgreSQL type overrides
//! - [`range`] / [`overrides`] - Native RANGE, ARRAY, HSTORE and ENUM handling
//! - [`forward`] - Host value → `postgres-types` parameter conversion
//! - [`reverse`] - PostgreSQL value → host value conversion
//! - [`ddl`] - PostgreSQL DDL generation
//!
//! # Example
//!
//! ```rust
//! use dtype_core::{DataType, Descriptor, ToDdl, TypeSystemOptions, Value};
//! use postgresql_types::{PostgreSQLDdl, PostgreSQLValue};
//!
//! let ddl = PostgreSQLDdl::new(TypeSystemOptions::default());
//! let column = Descriptor::new(DataType::range(DataType::integer()));
//! assert_eq!(ddl.to_ddl(&column)?, "int4range");
//!
//! let bound = column.specialize(ddl.dialect())?;
//! let range = Value::Array(vec![Value::from(1), Value::from(10)]);
//! assert_eq!(bound.to_inline_literal(&range)?, "'[1,10)'::int4range");
//! assert_eq!(
//!     PostgreSQLValue::from_descriptor(&bound, &range)?,
//!     PostgreSQLValue::Text("[1,10)".to_string())
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ddl;
pub mod dialect;
pub mod forward;
pub mod overrides;
pub mod range;
pub mod reverse;

pub use ddl::PostgreSQLDdl;
pub use dialect::{postgres_dialect, PostgresEscaper, DIALECT_NAME};
pub use forward::PostgreSQLValue;
pub use reverse::{pg_type_for, ConversionError, PostgreSQLRawValue, PostgreSQLValueWithSchema};
