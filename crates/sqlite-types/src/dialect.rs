//! The SQLite dialect.
//!
//! SQLite only knows five storage classes, so most kinds are declared with the
//! affinity name that stores them: `INTEGER`, `REAL`, `TEXT` or `BLOB`.

use dtype_core::kinds::StorageOverride;
use dtype_core::{
    CapabilityTable, CitextSupport, Descriptor, Dialect, FloatCapabilities, IntegerCapabilities,
    Result, StandardEscaper, TypeId, TypeSystemOptions,
};
use std::sync::Arc;

/// Name the dialect reports in messages.
pub const DIALECT_NAME: &str = "sqlite";

/// What SQLite supports natively.
pub fn capabilities() -> CapabilityTable {
    CapabilityTable {
        collate_binary: true,
        citext: CitextSupport::Collation("NOCASE".to_string()),
        // Every integer name has INTEGER affinity, but values are signed 64-bit
        ints: IntegerCapabilities {
            tinyint: true,
            mediumint: true,
            unsigned: false,
            zerofill: false,
            length: false,
        },
        float: FloatCapabilities::default(),
        real: FloatCapabilities::default(),
        double: FloatCapabilities::default(),
        decimal: None,
        boolean: false,
        json: true,
        ..CapabilityTable::default()
    }
}

fn integer(_d: &Descriptor) -> Result<String> {
    Ok("INTEGER".to_string())
}

fn real(_d: &Descriptor) -> Result<String> {
    Ok("REAL".to_string())
}

fn text(_d: &Descriptor) -> Result<String> {
    Ok("TEXT".to_string())
}

/// `TEXT`, with the binary collation for binary strings.
fn string(d: &Descriptor) -> Result<String> {
    Ok(match d.data_type().string_options() {
        Some(options) if options.binary => "TEXT COLLATE BINARY".to_string(),
        _ => "TEXT".to_string(),
    })
}

/// Build the SQLite dialect with the given options.
pub fn sqlite_dialect(options: TypeSystemOptions) -> Arc<Dialect> {
    let mut builder = Dialect::builder(DIALECT_NAME)
        .capabilities(capabilities())
        .escaper(StandardEscaper)
        .options(options);
    for type_id in TypeId::INTEGERS {
        builder = builder.override_type(type_id, StorageOverride::new(type_id, integer));
    }
    for type_id in [TypeId::Float, TypeId::Real, TypeId::Double] {
        builder = builder.override_type(type_id, StorageOverride::new(type_id, real));
    }
    for type_id in [TypeId::String, TypeId::Char] {
        builder = builder.override_type(type_id, StorageOverride::new(type_id, string));
    }
    for type_id in [TypeId::Date, TypeId::DateOnly, TypeId::Time, TypeId::Json] {
        builder = builder.override_type(type_id, StorageOverride::new(type_id, text));
    }
    builder.build()
}
