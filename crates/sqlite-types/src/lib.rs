//! SQLite dialect for dtype-core data types.
//!
//! SQLite stores every value in one of five storage classes, so this crate
//! maps each data type onto the affinity that holds it and adds CHECK
//! constraints where SQLite cannot enforce a type on its own.
//!
//! # Structure
//!
//! - `dialect`: Capabilities and the SQLite storage names
//! - `forward`: Convert host values → `SQLiteValue` (for INSERT operations)
//! - `reverse`: Convert SQLite values → host values (for reading data)
//! - `ddl`: Generate SQLite DDL
//!
//! # Example
//!
//! ```rust
//! use dtype_core::{DataType, Descriptor, ToDdl, TypeSystemOptions, Value};
//! use sqlite_types::{SQLiteDdl, SQLiteValue};
//!
//! let ddl = SQLiteDdl::new(TypeSystemOptions::default());
//! let status = Descriptor::new(DataType::enumeration(["on", "off"])?);
//! assert_eq!(ddl.to_ddl(&status)?, "TEXT");
//!
//! let bound = status.specialize(ddl.dialect())?;
//! assert!(bound.validate(&Value::from("maybe")).is_err());
//! assert_eq!(
//!     SQLiteValue::from_descriptor(&bound, &Value::from("on"))?,
//!     SQLiteValue::Text("on".to_string())
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ddl;
pub mod dialect;
pub mod forward;
pub mod reverse;

pub use ddl::SQLiteDdl;
pub use dialect::{sqlite_dialect, DIALECT_NAME};
pub use forward::SQLiteValue;
pub use reverse::{storage_class_for, ConversionError, StorageClass};
