//! MySQL dialect for dtype-core data types.
//!
//! This crate provides the MySQL capability table and overrides, plus
//! bidirectional conversions between descriptor values and `mysql_async`
//! values.
//!
//! # Structure
//!
//! - `dialect`: Capabilities, backslash escaping and the MySQL type overrides
//! - `forward`: Convert host values → `MySQLValue` (for INSERT operations)
//! - `reverse`: Convert MySQL values → host values (for reading data)
//! - `ddl`: Generate MySQL DDL
//!
//! # Example
//!
//! ```rust
//! use dtype_core::{DataType, Descriptor, ToDdl, TypeSystemOptions, Value};
//! use mysql_types::{MySQLDdl, MySQLValue};
//!
//! let ddl = MySQLDdl::new(TypeSystemOptions::default());
//! let flag = Descriptor::new(DataType::boolean());
//! assert_eq!(ddl.to_ddl(&flag)?, "TINYINT(1)");
//!
//! let bound = flag.specialize(ddl.dialect())?;
//! assert_eq!(bound.to_inline_literal(&Value::Bool(true))?, "1");
//! assert_eq!(
//!     MySQLValue::from_descriptor(&bound, &Value::Bool(true))?.into_inner(),
//!     mysql_async::Value::Int(1)
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ddl;
pub mod dialect;
pub mod forward;
pub mod reverse;

pub use ddl::MySQLDdl;
pub use dialect::{mysql_dialect, MySQLEscaper, DIALECT_NAME};
pub use forward::MySQLValue;
pub use reverse::{column_type_for, ConversionError, MySQLValueWithSchema};
