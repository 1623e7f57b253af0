//! The PostgreSQL dialect: capabilities, escaping and type overrides.

use crate::overrides::{PgArray, PgEnum, PgHstore};
use crate::range::PgRange;
use dtype_core::dialect::hex;
use dtype_core::kinds::StorageOverride;
use dtype_core::{
    CapabilityTable, CitextSupport, DecimalCapabilities, Descriptor, Dialect, FloatCapabilities,
    IntegerCapabilities, SqlEscaper, TypeId, TypeSystemOptions,
};
use std::sync::Arc;

/// Name the dialect reports in messages.
pub const DIALECT_NAME: &str = "postgres";

/// PostgreSQL literal syntax: doubled quotes, `\x` byte strings and `$n` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresEscaper;

impl SqlEscaper for PostgresEscaper {
    fn escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''").replace('\0', "\\0"))
    }

    fn escape_bytes(&self, value: &[u8]) -> String {
        format!("'\\x{}'", hex(value))
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${position}")
    }
}

/// What PostgreSQL supports natively.
pub fn capabilities() -> CapabilityTable {
    let float = FloatCapabilities {
        nan: true,
        infinity: true,
        zerofill: false,
        unsigned: false,
        scale_and_precision: false,
    };
    CapabilityTable {
        citext: CitextSupport::Native,
        ints: IntegerCapabilities {
            tinyint: false,
            mediumint: false,
            unsigned: false,
            zerofill: false,
            length: false,
        },
        float,
        real: float,
        double: float,
        decimal: Some(DecimalCapabilities {
            constrained: true,
            unconstrained: true,
            nan: true,
            infinity: true,
            zerofill: false,
            unsigned: false,
        }),
        boolean: true,
        uuid: true,
        json: true,
        jsonb: true,
        hstore: true,
        array: true,
        range: true,
        geometry: true,
        geography: true,
        cidr: true,
        inet: true,
        macaddr: true,
        macaddr8: true,
        tsvector: true,
        enums: true,
        blob: true,
        text_lengths: false,
        blob_lengths: false,
        datetime_infinity: true,
        dateonly_infinity: true,
        time_precision: true,
        ..CapabilityTable::default()
    }
}

fn timestamptz(d: &Descriptor) -> dtype_core::Result<String> {
    Ok(match d.data_type().time_options().and_then(|o| o.precision) {
        Some(precision) => format!("TIMESTAMP({precision}) WITH TIME ZONE"),
        None => "TIMESTAMP WITH TIME ZONE".to_string(),
    })
}

fn real(_d: &Descriptor) -> dtype_core::Result<String> {
    Ok("REAL".to_string())
}

fn bytea(_d: &Descriptor) -> dtype_core::Result<String> {
    Ok("BYTEA".to_string())
}

/// Build the PostgreSQL dialect with the given options.
pub fn postgres_dialect(options: TypeSystemOptions) -> Arc<Dialect> {
    Dialect::builder(DIALECT_NAME)
        .capabilities(capabilities())
        .escaper(PostgresEscaper)
        .options(options)
        .override_type(TypeId::Date, StorageOverride::new(TypeId::Date, timestamptz))
        .override_type(TypeId::Float, StorageOverride::new(TypeId::Float, real))
        .override_type(TypeId::Blob, StorageOverride::new(TypeId::Blob, bytea))
        .override_type(TypeId::Hstore, PgHstore)
        .override_type(TypeId::Range, PgRange)
        .override_type(TypeId::Array, PgArray)
        .override_type(TypeId::Enum, PgEnum)
        .build()
}
